//! DataTransfer handler

use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::types::DataTransferStatus;
use serde_json::Value;
use tracing::info;

use crate::application::handlers::{confirmation, parse_request, InboundContext};
use crate::application::session::{InboundAction, ProtocolError};

pub async fn handle_data_transfer(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: DataTransferRequest = parse_request(ctx, InboundAction::DataTransfer, payload)?;

    info!(
        charge_point_id = ctx.charge_point_id,
        vendor_id = req.vendor_string.as_str(),
        message_id = ?req.message_id,
        "DataTransfer"
    );

    Ok(confirmation(&DataTransferResponse {
        status: DataTransferStatus::Accepted,
        data: None,
    }))
}
