//! v1.6 UpdateFirmware

use chrono::{DateTime, Utc};
use rust_ocpp::v1_6::messages::update_firmware::UpdateFirmwareRequest;
use tracing::info;

use crate::application::commands::{encode, CommandError, CommandSender, PendingCommand};

/// The 1.6 confirmation is empty; any CallResult counts as acknowledged.
pub fn update_firmware(
    sender: &CommandSender,
    charge_point_id: &str,
    location: &str,
    retrieve_date: DateTime<Utc>,
) -> Result<PendingCommand<()>, CommandError> {
    info!(charge_point_id, location, %retrieve_date, "v1.6 UpdateFirmware");

    let payload = encode(&UpdateFirmwareRequest {
        location: location.to_string(),
        retries: None,
        retrieve_date,
        retry_interval: None,
    })?;

    sender.call(charge_point_id, "UpdateFirmware", payload, |_| Ok(()))
}
