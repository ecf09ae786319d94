//! v1.6 TriggerMessage

use rust_ocpp::v1_6::messages::trigger_message::{TriggerMessageRequest, TriggerMessageResponse};
use rust_ocpp::v1_6::types::MessageTrigger;
use tracing::info;

use crate::application::commands::{
    decode, encode, status_text, CommandError, CommandSender, PendingCommand, TriggerType,
};

pub fn trigger_message(
    sender: &CommandSender,
    charge_point_id: &str,
    requested_message: TriggerType,
    connector_id: Option<u32>,
) -> Result<PendingCommand<String>, CommandError> {
    info!(
        charge_point_id,
        ?requested_message,
        ?connector_id,
        "v1.6 TriggerMessage"
    );

    let trigger = match requested_message {
        TriggerType::Heartbeat => MessageTrigger::Heartbeat,
        TriggerType::StatusNotification => MessageTrigger::StatusNotification,
    };
    let payload = encode(&TriggerMessageRequest {
        requested_message: trigger,
        connector_id,
    })?;

    sender.call(charge_point_id, "TriggerMessage", payload, |value| {
        decode::<TriggerMessageResponse>(value).map(|r| status_text(&r.status))
    })
}
