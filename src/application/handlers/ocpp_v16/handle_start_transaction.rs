//! StartTransaction handler

use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::info;

use crate::application::handlers::{confirmation, connector_id, parse_request, InboundContext};
use crate::application::session::{InboundAction, ProtocolError};
use crate::domain::Transaction;

pub async fn handle_start_transaction(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: StartTransactionRequest =
        parse_request(ctx, InboundAction::StartTransaction, payload)?;

    let connector_id = connector_id(InboundAction::StartTransaction, req.connector_id)?;
    let transaction_id = ctx.manager.allocator().next_id();

    info!(
        charge_point_id = ctx.charge_point_id,
        connector_id,
        transaction_id,
        id_tag = req.id_tag.as_str(),
        meter_start = req.meter_start,
        "StartTransaction"
    );

    let transaction = Transaction::start(
        transaction_id,
        ctx.charge_point_id,
        connector_id,
        req.id_tag,
        req.meter_start,
        req.timestamp,
    );
    let stored = match ctx.ensure_connector(connector_id).await {
        Ok(()) => ctx.store().insert_transaction(transaction).await,
        Err(e) => Err(e),
    };
    if let Err(e) = stored {
        ctx.store_failed(InboundAction::StartTransaction, &e);
    }

    Ok(confirmation(&StartTransactionResponse {
        transaction_id,
        id_tag_info: IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        },
    }))
}
