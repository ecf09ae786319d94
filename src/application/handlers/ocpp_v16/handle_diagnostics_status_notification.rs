//! DiagnosticsStatusNotification handler

use rust_ocpp::v1_6::messages::diagnostics_status_notification::{
    DiagnosticsStatusNotificationRequest, DiagnosticsStatusNotificationResponse,
};
use serde_json::Value;
use tracing::info;

use crate::application::handlers::{confirmation, parse_request, InboundContext};
use crate::application::session::{InboundAction, ProtocolError};

/// Recorded through the audit trail only.
pub async fn handle_diagnostics_status_notification(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: DiagnosticsStatusNotificationRequest =
        parse_request(ctx, InboundAction::DiagnosticsStatusNotification, payload)?;

    info!(
        charge_point_id = ctx.charge_point_id,
        status = ?req.status,
        "DiagnosticsStatusNotification"
    );

    Ok(confirmation(&DiagnosticsStatusNotificationResponse {}))
}
