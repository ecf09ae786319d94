//! MeterValues handler

use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use serde_json::Value;
use tracing::info;

use crate::application::handlers::{confirmation, connector_id, parse_request, InboundContext};
use crate::application::session::{InboundAction, ProtocolError};

/// One stored row per sampled value; unparsable readings are stored as 0.0.
pub async fn handle_meter_values(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: MeterValuesRequest = parse_request(ctx, InboundAction::MeterValues, payload)?;
    let connector_id = connector_id(InboundAction::MeterValues, req.connector_id)?;

    info!(
        charge_point_id = ctx.charge_point_id,
        connector_id,
        transaction_id = ?req.transaction_id,
        samples = req.meter_value.len(),
        "MeterValues"
    );

    ctx.persist_meter_batches(
        InboundAction::MeterValues,
        connector_id,
        req.transaction_id,
        &req.meter_value,
    )
    .await;

    Ok(confirmation(&MeterValuesResponse {}))
}
