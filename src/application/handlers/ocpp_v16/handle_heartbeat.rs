//! Heartbeat handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::Value;
use tracing::debug;

use crate::application::handlers::{confirmation, InboundContext};
use crate::application::session::{InboundAction, ProtocolError};

pub async fn handle_heartbeat(
    ctx: &InboundContext<'_>,
    _payload: &Value,
) -> Result<Value, ProtocolError> {
    debug!(charge_point_id = ctx.charge_point_id, "Heartbeat");

    let now = Utc::now();
    if let Err(e) = ctx.store().update_heartbeat(ctx.charge_point_id, now).await {
        ctx.store_failed(InboundAction::Heartbeat, &e);
    }

    Ok(confirmation(&HeartbeatResponse { current_time: now }))
}
