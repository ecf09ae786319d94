//! State store contract
//!
//! Each operation is atomic on its own; nothing here composes writes across
//! entities. Implementations must be safe for concurrent use by every
//! connection task.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    ChargePoint, Connector, MeterValue, OcppMessage, StopOutcome, StoreResult, Transaction,
};

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert or update by id. On update, `connected_since` only takes the
    /// incoming value when the stored record was disconnected and the
    /// incoming one is connected; `created_at` is preserved.
    async fn upsert_charge_point(&self, charge_point: ChargePoint) -> StoreResult<()>;

    async fn get_charge_point(&self, id: &str) -> StoreResult<Option<ChargePoint>>;

    /// All charge points, newest first.
    async fn list_charge_points(&self) -> StoreResult<Vec<ChargePoint>>;

    /// Replace status and error code of (`charge_point_id`, `connector_id`),
    /// creating the row when absent.
    async fn upsert_connector(&self, connector: Connector) -> StoreResult<()>;

    async fn get_connector(
        &self,
        charge_point_id: &str,
        connector_id: i32,
    ) -> StoreResult<Option<Connector>>;

    /// Connectors of one charge point ordered by connector id.
    async fn list_connectors(&self, charge_point_id: &str) -> StoreResult<Vec<Connector>>;

    /// Fails with [`StoreError::Conflict`](super::StoreError::Conflict) when
    /// the id is already taken.
    async fn insert_transaction(&self, transaction: Transaction) -> StoreResult<()>;

    /// Move a transaction to Completed. A transaction that is already
    /// Completed is left untouched and reported as
    /// [`StopOutcome::AlreadyCompleted`].
    async fn complete_transaction(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        meter_stop: i32,
    ) -> StoreResult<StopOutcome>;

    async fn get_transaction(&self, id: i32) -> StoreResult<Option<Transaction>>;

    /// Highest transaction id ever stored, used to seed the id allocator.
    async fn max_transaction_id(&self) -> StoreResult<Option<i32>>;

    async fn append_meter_value(&self, meter_value: MeterValue) -> StoreResult<()>;

    async fn append_message(&self, message: OcppMessage) -> StoreResult<()>;

    /// Flip `is_connected`; `connected_since` is stamped with `at` only on a
    /// false → true transition.
    async fn set_connected(&self, id: &str, connected: bool, at: DateTime<Utc>)
        -> StoreResult<()>;

    async fn update_heartbeat(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// Mark every charge point disconnected. Called once at startup, before
    /// any connection is accepted, to clear flags left by an unclean
    /// shutdown. Returns the number of records changed.
    async fn reset_connections(&self, at: DateTime<Utc>) -> StoreResult<u64>;
}

pub type SharedStateStore = Arc<dyn StateStore>;
