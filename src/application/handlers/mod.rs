//! Inbound action handlers
//!
//! ```text
//! SessionManager::handle ──► InboundAction::from_str ──► dispatch ──► ocpp_v16::handle_*
//! ```
//!
//! Every handler returns a confirmation even when the store rejects the
//! mutation; only payloads that fail to deserialize or carry out-of-range
//! ids become a [`ProtocolError`].

pub mod ocpp_v16;

use chrono::Utc;
use rust_ocpp::v1_6::types::MeterValue as SampledBatch;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::application::session::{InboundAction, ProtocolError, SessionManager};
use crate::domain::{
    Connector, ConnectorStatus, MeterValue, SharedStateStore, StoreError, DEFAULT_MEASURAND,
    DEFAULT_UNIT,
};

/// Error code recorded for connectors created implicitly.
const NO_ERROR: &str = "NoError";

/// Borrowed view of the session manager for one inbound Call.
pub struct InboundContext<'a> {
    pub charge_point_id: &'a str,
    pub manager: &'a SessionManager,
}

impl InboundContext<'_> {
    pub fn store(&self) -> &SharedStateStore {
        self.manager.store()
    }

    /// Log a swallowed store failure with the device and action it belongs to.
    pub fn store_failed(&self, action: InboundAction, err: &StoreError) {
        metrics::counter!("ocpp_store_errors_total", "action" => action.as_str()).increment(1);
        error!(
            charge_point_id = self.charge_point_id,
            action = action.as_str(),
            error = %err,
            "State store write failed, confirming anyway"
        );
    }

    /// Create the connector row as Available when it does not exist yet, so
    /// transactions and meter values can reference it.
    pub async fn ensure_connector(&self, connector_id: i32) -> Result<(), StoreError> {
        let store = self.store();
        if store
            .get_connector(self.charge_point_id, connector_id)
            .await?
            .is_some()
        {
            return Ok(());
        }
        store
            .upsert_connector(Connector::new(
                self.charge_point_id,
                connector_id,
                ConnectorStatus::Available,
                NO_ERROR,
                Utc::now(),
            ))
            .await
    }

    /// Append one [`MeterValue`] per sampled value. Failures are logged per
    /// sample; the rest of the batch is still written.
    pub async fn persist_meter_batches(
        &self,
        action: InboundAction,
        connector_id: i32,
        transaction_id: Option<i32>,
        batches: &[SampledBatch],
    ) {
        if batches.is_empty() {
            return;
        }
        if let Err(e) = self.ensure_connector(connector_id).await {
            self.store_failed(action, &e);
            return;
        }

        for batch in batches {
            for sampled in &batch.sampled_value {
                let sample = MeterValue {
                    transaction_id,
                    charge_point_id: self.charge_point_id.to_string(),
                    connector_id,
                    timestamp: batch.timestamp,
                    value: MeterValue::parse_value(&sampled.value),
                    unit: sampled
                        .unit
                        .as_ref()
                        .and_then(wire_name)
                        .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
                    measurand: sampled
                        .measurand
                        .as_ref()
                        .and_then(wire_name)
                        .unwrap_or_else(|| DEFAULT_MEASURAND.to_string()),
                };
                if let Err(e) = self.store().append_meter_value(sample).await {
                    self.store_failed(action, &e);
                }
            }
        }
    }
}

/// Lookup table from action to handler.
pub async fn dispatch(
    ctx: &InboundContext<'_>,
    action: InboundAction,
    payload: &Value,
) -> Result<Value, ProtocolError> {
    use ocpp_v16::*;

    match action {
        InboundAction::Authorize => handle_authorize(ctx, payload).await,
        InboundAction::BootNotification => handle_boot_notification(ctx, payload).await,
        InboundAction::DataTransfer => handle_data_transfer(ctx, payload).await,
        InboundAction::DiagnosticsStatusNotification => {
            handle_diagnostics_status_notification(ctx, payload).await
        }
        InboundAction::FirmwareStatusNotification => {
            handle_firmware_status_notification(ctx, payload).await
        }
        InboundAction::Heartbeat => handle_heartbeat(ctx, payload).await,
        InboundAction::MeterValues => handle_meter_values(ctx, payload).await,
        InboundAction::StartTransaction => handle_start_transaction(ctx, payload).await,
        InboundAction::StatusNotification => handle_status_notification(ctx, payload).await,
        InboundAction::StopTransaction => handle_stop_transaction(ctx, payload).await,
    }
}

pub(crate) fn parse_request<T: DeserializeOwned>(
    ctx: &InboundContext<'_>,
    action: InboundAction,
    payload: &Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(payload.clone()).map_err(|e| {
        warn!(
            charge_point_id = ctx.charge_point_id,
            action = action.as_str(),
            error = %e,
            "Malformed request payload"
        );
        ProtocolError::FormationViolation(format!("{}: {}", action, e))
    })
}

/// Connector ids arrive unsigned but are stored as `i32`.
pub(crate) fn connector_id(action: InboundAction, raw: u32) -> Result<i32, ProtocolError> {
    i32::try_from(raw).map_err(|_| {
        ProtocolError::PropertyConstraintViolation(format!("{}: connectorId {} out of range", action, raw))
    })
}

pub(crate) fn confirmation<T: Serialize>(response: &T) -> Value {
    serde_json::to_value(response).unwrap_or_default()
}

/// Wire spelling of a protocol enum (e.g. `"Energy.Active.Import.Register"`).
pub(crate) fn wire_name<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_value(value).ok()? {
        Value::String(s) => Some(s),
        _ => None,
    }
}
