//! Transaction DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Transaction;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: i32,
    pub charge_point_id: String,
    pub connector_id: i32,
    pub id_tag: String,
    pub start_time: DateTime<Utc>,
    /// Wh
    pub meter_start: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_stop: Option<i32>,
    /// `meterStop - meterStart` once the transaction is completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_wh: Option<i32>,
    pub status: String,
}

impl From<Transaction> for TransactionDto {
    fn from(tx: Transaction) -> Self {
        let energy_wh = tx.meter_stop.map(|stop| stop.saturating_sub(tx.meter_start));
        Self {
            id: tx.id,
            charge_point_id: tx.charge_point_id,
            connector_id: tx.connector_id,
            id_tag: tx.id_tag,
            start_time: tx.start_time,
            meter_start: tx.meter_start,
            end_time: tx.end_time,
            meter_stop: tx.meter_stop,
            energy_wh,
            status: tx.status.to_string(),
        }
    }
}
