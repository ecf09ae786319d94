//! StatusNotification handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use serde_json::Value;
use tracing::info;

use crate::application::handlers::{
    confirmation, connector_id, parse_request, wire_name, InboundContext,
};
use crate::application::session::{InboundAction, ProtocolError};
use crate::domain::{Connector, ConnectorStatus};

pub async fn handle_status_notification(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: StatusNotificationRequest =
        parse_request(ctx, InboundAction::StatusNotification, payload)?;
    let connector_id = connector_id(InboundAction::StatusNotification, req.connector_id)?;

    let status = wire_name(&req.status)
        .map(|s| ConnectorStatus::from(s.as_str()))
        .unwrap_or(ConnectorStatus::Unavailable);
    let error_code = wire_name(&req.error_code).unwrap_or_else(|| "NoError".to_string());

    info!(
        charge_point_id = ctx.charge_point_id,
        connector_id,
        %status,
        error_code = error_code.as_str(),
        info = ?req.info,
        "StatusNotification"
    );

    let connector = Connector::new(
        ctx.charge_point_id,
        connector_id,
        status,
        error_code,
        Utc::now(),
    );
    if let Err(e) = ctx.store().upsert_connector(connector).await {
        ctx.store_failed(InboundAction::StatusNotification, &e);
    }

    Ok(confirmation(&StatusNotificationResponse {}))
}
