//! v1.6 UnlockConnector

use rust_ocpp::v1_6::messages::unlock_connector::{
    UnlockConnectorRequest, UnlockConnectorResponse,
};
use tracing::info;

use crate::application::commands::{
    decode, encode, status_text, CommandError, CommandSender, PendingCommand,
};

pub fn unlock_connector(
    sender: &CommandSender,
    charge_point_id: &str,
    connector_id: u32,
) -> Result<PendingCommand<String>, CommandError> {
    info!(charge_point_id, connector_id, "v1.6 UnlockConnector");

    let payload = encode(&UnlockConnectorRequest { connector_id })?;

    sender.call(charge_point_id, "UnlockConnector", payload, |value| {
        decode::<UnlockConnectorResponse>(value).map(|r| status_text(&r.status))
    })
}
