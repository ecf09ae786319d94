//! v1.6 ChangeAvailability

use rust_ocpp::v1_6::messages::change_availability::{
    ChangeAvailabilityRequest, ChangeAvailabilityResponse,
};
use rust_ocpp::v1_6::types::AvailabilityType;
use tracing::info;

use crate::application::commands::{
    decode, encode, status_text, Availability, CommandError, CommandSender, PendingCommand,
};

/// `connector_id` 0 addresses the whole charge point.
pub fn change_availability(
    sender: &CommandSender,
    charge_point_id: &str,
    connector_id: u32,
    availability: Availability,
) -> Result<PendingCommand<String>, CommandError> {
    info!(charge_point_id, connector_id, ?availability, "v1.6 ChangeAvailability");

    let kind = match availability {
        Availability::Operative => AvailabilityType::Operative,
        Availability::Inoperative => AvailabilityType::Inoperative,
    };
    let payload = encode(&ChangeAvailabilityRequest { connector_id, kind })?;

    sender.call(charge_point_id, "ChangeAvailability", payload, |value| {
        decode::<ChangeAvailabilityResponse>(value).map(|r| status_text(&r.status))
    })
}
