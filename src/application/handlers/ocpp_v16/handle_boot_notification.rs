//! BootNotification handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::types::RegistrationStatus as WireRegistrationStatus;
use serde_json::Value;
use tracing::{info, warn};

use crate::application::handlers::{confirmation, parse_request, InboundContext};
use crate::application::session::{BootInfo, InboundAction, ProtocolError};
use crate::domain::{ChargePoint, RegistrationStatus};

pub async fn handle_boot_notification(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: BootNotificationRequest =
        parse_request(ctx, InboundAction::BootNotification, payload)?;

    let status = ctx.manager.policy().decide(&BootInfo {
        charge_point_id: ctx.charge_point_id,
        vendor: &req.charge_point_vendor,
        model: &req.charge_point_model,
        serial_number: req.charge_point_serial_number.as_deref(),
        firmware_version: req.firmware_version.as_deref(),
    });

    info!(
        charge_point_id = ctx.charge_point_id,
        vendor = req.charge_point_vendor.as_str(),
        model = req.charge_point_model.as_str(),
        firmware = ?req.firmware_version,
        %status,
        "BootNotification"
    );
    if status == RegistrationStatus::Rejected {
        warn!(charge_point_id = ctx.charge_point_id, "Registration rejected by policy");
    }

    let now = Utc::now();
    let charge_point = ChargePoint {
        id: ctx.charge_point_id.to_string(),
        vendor: req.charge_point_vendor,
        model: req.charge_point_model,
        serial_number: req.charge_point_serial_number,
        firmware_version: req.firmware_version,
        registration_status: status,
        is_connected: true,
        connected_since: Some(now),
        last_heartbeat: Some(now),
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = ctx.store().upsert_charge_point(charge_point).await {
        ctx.store_failed(InboundAction::BootNotification, &e);
    }

    let wire_status = match status {
        RegistrationStatus::Accepted => WireRegistrationStatus::Accepted,
        RegistrationStatus::Pending => WireRegistrationStatus::Pending,
        RegistrationStatus::Rejected => WireRegistrationStatus::Rejected,
    };

    Ok(confirmation(&BootNotificationResponse {
        current_time: now,
        interval: ctx.manager.heartbeat_interval(),
        status: wire_status,
    }))
}
