//! StopTransaction handler

use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::{info, warn};

use crate::application::handlers::{confirmation, parse_request, InboundContext};
use crate::application::session::{InboundAction, ProtocolError};
use crate::domain::{StopOutcome, StoreError};

/// The stop path carries no connector id, so embedded samples are stored
/// against connector 0.
const STOP_PATH_CONNECTOR: i32 = 0;

pub async fn handle_stop_transaction(
    ctx: &InboundContext<'_>,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    let req: StopTransactionRequest =
        parse_request(ctx, InboundAction::StopTransaction, payload)?;

    info!(
        charge_point_id = ctx.charge_point_id,
        transaction_id = req.transaction_id,
        meter_stop = req.meter_stop,
        reason = ?req.reason,
        "StopTransaction"
    );

    match ctx
        .store()
        .complete_transaction(req.transaction_id, req.timestamp, req.meter_stop)
        .await
    {
        Ok(StopOutcome::Completed(tx)) => {
            info!(
                charge_point_id = ctx.charge_point_id,
                transaction_id = tx.id,
                energy_wh = req.meter_stop - tx.meter_start,
                "Transaction completed"
            );
            if let Some(batches) = req.transaction_data.as_deref() {
                ctx.persist_meter_batches(
                    InboundAction::StopTransaction,
                    STOP_PATH_CONNECTOR,
                    Some(req.transaction_id),
                    batches,
                )
                .await;
            }
        }
        Ok(StopOutcome::AlreadyCompleted(tx)) => {
            warn!(
                charge_point_id = ctx.charge_point_id,
                transaction_id = tx.id,
                stored_meter_stop = ?tx.meter_stop,
                replayed_meter_stop = req.meter_stop,
                "Repeated StopTransaction ignored"
            );
        }
        Err(StoreError::NotFound { .. }) => {
            warn!(
                charge_point_id = ctx.charge_point_id,
                transaction_id = req.transaction_id,
                "StopTransaction for unknown transaction"
            );
        }
        Err(e) => ctx.store_failed(InboundAction::StopTransaction, &e),
    }

    Ok(confirmation(&StopTransactionResponse {
        id_tag_info: req.id_tag.as_ref().map(|_| IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        }),
    }))
}
