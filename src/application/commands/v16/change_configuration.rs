//! v1.6 ChangeConfiguration

use rust_ocpp::v1_6::messages::change_configuration::{
    ChangeConfigurationRequest, ChangeConfigurationResponse,
};
use tracing::info;

use crate::application::commands::{
    decode, encode, status_text, CommandError, CommandSender, PendingCommand,
};

pub fn change_configuration(
    sender: &CommandSender,
    charge_point_id: &str,
    key: &str,
    value: &str,
) -> Result<PendingCommand<String>, CommandError> {
    info!(charge_point_id, key, value, "v1.6 ChangeConfiguration");

    let payload = encode(&ChangeConfigurationRequest {
        key: key.to_string(),
        value: value.to_string(),
    })?;

    sender.call(charge_point_id, "ChangeConfiguration", payload, |value| {
        decode::<ChangeConfigurationResponse>(value).map(|r| status_text(&r.status))
    })
}
