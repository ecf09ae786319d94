//! v1.6 Reset

use rust_ocpp::v1_6::messages::reset::{ResetRequest, ResetResponse};
use rust_ocpp::v1_6::types::ResetRequestStatus;
use tracing::info;

use crate::application::commands::{
    decode, encode, status_text, CommandError, CommandSender, PendingCommand, ResetKind,
};

pub fn reset(
    sender: &CommandSender,
    charge_point_id: &str,
    reset_type: ResetKind,
) -> Result<PendingCommand<String>, CommandError> {
    info!(charge_point_id, ?reset_type, "v1.6 Reset");

    let kind = match reset_type {
        ResetKind::Soft => ResetRequestStatus::Soft,
        ResetKind::Hard => ResetRequestStatus::Hard,
    };
    let payload = encode(&ResetRequest { kind })?;

    sender.call(charge_point_id, "Reset", payload, |value| {
        decode::<ResetResponse>(value).map(|r| status_text(&r.status))
    })
}
