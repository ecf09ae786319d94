//! FirmwareStatusNotification handler

use rust_ocpp::v1_6::messages::firmware_status_notification::{
    FirmwareStatusNotificationRequest, FirmwareStatusNotificationResponse,
};
use serde_json::Value;
use tracing::info;

use crate::application::handlers::{confirmation, parse_request, InboundContext};
use crate::application::session::{InboundAction, ProtocolError};

pub async fn handle_firmware_status_notification(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: FirmwareStatusNotificationRequest =
        parse_request(ctx, InboundAction::FirmwareStatusNotification, payload)?;

    info!(
        charge_point_id = ctx.charge_point_id,
        status = ?req.status,
        "FirmwareStatusNotification"
    );

    Ok(confirmation(&FirmwareStatusNotificationResponse {}))
}
