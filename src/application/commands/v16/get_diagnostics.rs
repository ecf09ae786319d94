//! v1.6 GetDiagnostics

use chrono::{DateTime, Utc};
use rust_ocpp::v1_6::messages::get_diagnostics::{GetDiagnosticsRequest, GetDiagnosticsResponse};
use tracing::info;

use crate::application::commands::{decode, encode, CommandError, CommandSender, PendingCommand};

/// Resolves to the file name the charge point will upload, if any.
pub fn get_diagnostics(
    sender: &CommandSender,
    charge_point_id: &str,
    location: &str,
    start_time: Option<DateTime<Utc>>,
    stop_time: Option<DateTime<Utc>>,
) -> Result<PendingCommand<Option<String>>, CommandError> {
    info!(charge_point_id, location, ?start_time, ?stop_time, "v1.6 GetDiagnostics");

    let payload = encode(&GetDiagnosticsRequest {
        location: location.to_string(),
        retries: None,
        retry_interval: None,
        start_time,
        stop_time,
    })?;

    sender.call(charge_point_id, "GetDiagnostics", payload, |value| {
        decode::<GetDiagnosticsResponse>(value).map(|r| r.file_name)
    })
}
