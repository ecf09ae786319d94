//! v1.6 RemoteStartTransaction

use rust_ocpp::v1_6::messages::remote_start_transaction::{
    RemoteStartTransactionRequest, RemoteStartTransactionResponse,
};
use tracing::info;

use crate::application::commands::{
    decode, encode, status_text, CommandError, CommandSender, PendingCommand,
};

pub fn remote_start_transaction(
    sender: &CommandSender,
    charge_point_id: &str,
    connector_id: u32,
    id_tag: &str,
) -> Result<PendingCommand<String>, CommandError> {
    info!(charge_point_id, connector_id, id_tag, "v1.6 RemoteStartTransaction");

    let payload = encode(&RemoteStartTransactionRequest {
        connector_id: Some(connector_id),
        id_tag: id_tag.to_string(),
        charging_profile: None,
    })?;

    sender.call(charge_point_id, "RemoteStartTransaction", payload, |value| {
        decode::<RemoteStartTransactionResponse>(value).map(|r| status_text(&r.status))
    })
}
