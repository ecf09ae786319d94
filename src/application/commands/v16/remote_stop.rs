//! v1.6 RemoteStopTransaction

use rust_ocpp::v1_6::messages::remote_stop_transaction::{
    RemoteStopTransactionRequest, RemoteStopTransactionResponse,
};
use tracing::info;

use crate::application::commands::{
    decode, encode, status_text, CommandError, CommandSender, PendingCommand,
};

pub fn remote_stop_transaction(
    sender: &CommandSender,
    charge_point_id: &str,
    transaction_id: i32,
) -> Result<PendingCommand<String>, CommandError> {
    info!(charge_point_id, transaction_id, "v1.6 RemoteStopTransaction");

    let payload = encode(&RemoteStopTransactionRequest { transaction_id })?;

    sender.call(charge_point_id, "RemoteStopTransaction", payload, |value| {
        decode::<RemoteStopTransactionResponse>(value).map(|r| status_text(&r.status))
    })
}
