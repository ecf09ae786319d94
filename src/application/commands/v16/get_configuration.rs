//! v1.6 GetConfiguration

use rust_ocpp::v1_6::messages::get_configuration::{
    GetConfigurationRequest, GetConfigurationResponse,
};
use serde_json::Value;
use tracing::info;

use crate::application::commands::{
    decode, encode, CommandError, CommandSender, ConfigurationResult, KeyValue, PendingCommand,
};

/// `None` or an empty list asks for every key.
pub fn get_configuration(
    sender: &CommandSender,
    charge_point_id: &str,
    keys: Option<Vec<String>>,
) -> Result<PendingCommand<ConfigurationResult>, CommandError> {
    info!(charge_point_id, ?keys, "v1.6 GetConfiguration");

    let key = keys.filter(|k| !k.is_empty());
    let payload = encode(&GetConfigurationRequest { key })?;

    sender.call(charge_point_id, "GetConfiguration", payload, into_result)
}

fn into_result(value: Value) -> Result<ConfigurationResult, CommandError> {
    let response: GetConfigurationResponse = decode(value)?;
    let configuration_key = response
        .configuration_key
        .unwrap_or_default()
        .into_iter()
        .map(|kv| KeyValue {
            key: kv.key,
            readonly: kv.readonly,
            value: kv.value,
        })
        .collect();

    Ok(ConfigurationResult {
        configuration_key,
        unknown_key: response.unknown_key.unwrap_or_default(),
    })
}
