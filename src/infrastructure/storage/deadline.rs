//! Bounded-deadline wrapper around any [`StateStore`]

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    ChargePoint, Connector, MeterValue, OcppMessage, SharedStateStore, StateStore, StopOutcome,
    StoreError, StoreResult, Transaction,
};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fails any call that does not finish within `timeout` with
/// [`StoreError::Timeout`]. The inner future is dropped on expiry.
pub struct DeadlineStore {
    inner: SharedStateStore,
    timeout: Duration,
}

impl DeadlineStore {
    pub fn new(inner: SharedStateStore, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl StateStore for DeadlineStore {
    async fn upsert_charge_point(&self, charge_point: ChargePoint) -> StoreResult<()> {
        self.bounded(self.inner.upsert_charge_point(charge_point)).await
    }

    async fn get_charge_point(&self, id: &str) -> StoreResult<Option<ChargePoint>> {
        self.bounded(self.inner.get_charge_point(id)).await
    }

    async fn list_charge_points(&self) -> StoreResult<Vec<ChargePoint>> {
        self.bounded(self.inner.list_charge_points()).await
    }

    async fn upsert_connector(&self, connector: Connector) -> StoreResult<()> {
        self.bounded(self.inner.upsert_connector(connector)).await
    }

    async fn get_connector(
        &self,
        charge_point_id: &str,
        connector_id: i32,
    ) -> StoreResult<Option<Connector>> {
        self.bounded(self.inner.get_connector(charge_point_id, connector_id))
            .await
    }

    async fn list_connectors(&self, charge_point_id: &str) -> StoreResult<Vec<Connector>> {
        self.bounded(self.inner.list_connectors(charge_point_id)).await
    }

    async fn insert_transaction(&self, transaction: Transaction) -> StoreResult<()> {
        self.bounded(self.inner.insert_transaction(transaction)).await
    }

    async fn complete_transaction(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        meter_stop: i32,
    ) -> StoreResult<StopOutcome> {
        self.bounded(self.inner.complete_transaction(id, end_time, meter_stop))
            .await
    }

    async fn get_transaction(&self, id: i32) -> StoreResult<Option<Transaction>> {
        self.bounded(self.inner.get_transaction(id)).await
    }

    async fn max_transaction_id(&self) -> StoreResult<Option<i32>> {
        self.bounded(self.inner.max_transaction_id()).await
    }

    async fn append_meter_value(&self, meter_value: MeterValue) -> StoreResult<()> {
        self.bounded(self.inner.append_meter_value(meter_value)).await
    }

    async fn append_message(&self, message: OcppMessage) -> StoreResult<()> {
        self.bounded(self.inner.append_message(message)).await
    }

    async fn set_connected(
        &self,
        id: &str,
        connected: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.bounded(self.inner.set_connected(id, connected, at)).await
    }

    async fn update_heartbeat(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.bounded(self.inner.update_heartbeat(id, at)).await
    }

    async fn reset_connections(&self, at: DateTime<Utc>) -> StoreResult<u64> {
        self.bounded(self.inner.reset_connections(at)).await
    }
}
