//! Store double for exercising slow and failing persistence

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use tokio::sync::Notify;

use super::InMemoryStore;
use crate::domain::{
    ChargePoint, Connector, MeterValue, OcppMessage, StateStore, StopOutcome, StoreError,
    StoreResult, Transaction,
};

/// Kinds of write that can be held open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    ChargePoint,
    Connector,
    Transaction,
    MeterValue,
    Message,
    Connection,
    Heartbeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Database,
    Timeout,
}

/// Wraps an [`InMemoryStore`]. One write of a chosen kind can be parked
/// until [`release`](Self::release), and every call can be made to fail.
#[derive(Default)]
pub struct ScriptedStore {
    inner: InMemoryStore,
    hold: Mutex<Option<Write>>,
    failure: Mutex<Option<Failure>>,
    started: Notify,
    release: Notify,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Park the next write of this kind until [`release`](Self::release).
    pub fn hold_next(&self, write: Write) {
        *self.hold.lock().unwrap() = Some(write);
    }

    /// Resolves once the parked write has started.
    pub async fn held(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn fail_with(&self, failure: Option<Failure>) {
        *self.failure.lock().unwrap() = failure;
    }

    fn check(&self) -> StoreResult<()> {
        match *self.failure.lock().unwrap() {
            None => Ok(()),
            Some(Failure::Database) => Err(StoreError::Database(DbErr::Custom(
                "connection reset".to_string(),
            ))),
            Some(Failure::Timeout) => Err(StoreError::Timeout(std::time::Duration::from_secs(5))),
        }
    }

    async fn before_write(&self, write: Write) -> StoreResult<()> {
        let parked = {
            let mut hold = self.hold.lock().unwrap();
            if *hold == Some(write) {
                *hold = None;
                true
            } else {
                false
            }
        };
        if parked {
            self.started.notify_one();
            self.release.notified().await;
        }
        self.check()
    }
}

#[async_trait]
impl StateStore for ScriptedStore {
    async fn upsert_charge_point(&self, charge_point: ChargePoint) -> StoreResult<()> {
        self.before_write(Write::ChargePoint).await?;
        self.inner.upsert_charge_point(charge_point).await
    }

    async fn get_charge_point(&self, id: &str) -> StoreResult<Option<ChargePoint>> {
        self.check()?;
        self.inner.get_charge_point(id).await
    }

    async fn list_charge_points(&self) -> StoreResult<Vec<ChargePoint>> {
        self.check()?;
        self.inner.list_charge_points().await
    }

    async fn upsert_connector(&self, connector: Connector) -> StoreResult<()> {
        self.before_write(Write::Connector).await?;
        self.inner.upsert_connector(connector).await
    }

    async fn get_connector(
        &self,
        charge_point_id: &str,
        connector_id: i32,
    ) -> StoreResult<Option<Connector>> {
        self.check()?;
        self.inner.get_connector(charge_point_id, connector_id).await
    }

    async fn list_connectors(&self, charge_point_id: &str) -> StoreResult<Vec<Connector>> {
        self.check()?;
        self.inner.list_connectors(charge_point_id).await
    }

    async fn insert_transaction(&self, transaction: Transaction) -> StoreResult<()> {
        self.before_write(Write::Transaction).await?;
        self.inner.insert_transaction(transaction).await
    }

    async fn complete_transaction(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        meter_stop: i32,
    ) -> StoreResult<StopOutcome> {
        self.before_write(Write::Transaction).await?;
        self.inner.complete_transaction(id, end_time, meter_stop).await
    }

    async fn get_transaction(&self, id: i32) -> StoreResult<Option<Transaction>> {
        self.check()?;
        self.inner.get_transaction(id).await
    }

    async fn max_transaction_id(&self) -> StoreResult<Option<i32>> {
        self.check()?;
        self.inner.max_transaction_id().await
    }

    async fn append_meter_value(&self, meter_value: MeterValue) -> StoreResult<()> {
        self.before_write(Write::MeterValue).await?;
        self.inner.append_meter_value(meter_value).await
    }

    async fn append_message(&self, message: OcppMessage) -> StoreResult<()> {
        self.before_write(Write::Message).await?;
        self.inner.append_message(message).await
    }

    async fn set_connected(
        &self,
        id: &str,
        connected: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.before_write(Write::Connection).await?;
        self.inner.set_connected(id, connected, at).await
    }

    async fn update_heartbeat(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.before_write(Write::Heartbeat).await?;
        self.inner.update_heartbeat(id, at).await
    }

    async fn reset_connections(&self, at: DateTime<Utc>) -> StoreResult<u64> {
        self.before_write(Write::Connection).await?;
        self.inner.reset_connections(at).await
    }
}
