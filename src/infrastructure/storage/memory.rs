//! In-memory state store for development and testing

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{
    ChargePoint, Connector, MeterValue, OcppMessage, StateStore, StopOutcome, StoreError,
    StoreResult, Transaction,
};

/// [`StateStore`] backed by concurrent maps. Enforces the same referential
/// rules as the relational schema so tests catch ordering mistakes.
pub struct InMemoryStore {
    charge_points: DashMap<String, ChargePoint>,
    connectors: DashMap<(String, i32), Connector>,
    transactions: DashMap<i32, Transaction>,
    meter_values: DashMap<i64, MeterValue>,
    messages: DashMap<i64, OcppMessage>,
    row_counter: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            charge_points: DashMap::new(),
            connectors: DashMap::new(),
            transactions: DashMap::new(),
            meter_values: DashMap::new(),
            messages: DashMap::new(),
            row_counter: AtomicI64::new(1),
        }
    }

    fn next_row_id(&self) -> i64 {
        self.row_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Stored meter values in insertion order.
    pub fn meter_values(&self) -> Vec<MeterValue> {
        sorted_rows(&self.meter_values)
    }

    /// Stored audit messages in insertion order.
    pub fn messages(&self) -> Vec<OcppMessage> {
        sorted_rows(&self.messages)
    }

    fn require_charge_point(&self, id: &str) -> StoreResult<()> {
        if self.charge_points.contains_key(id) {
            Ok(())
        } else {
            Err(StoreError::not_found("charge_point", "id", id))
        }
    }

    fn require_connector(&self, charge_point_id: &str, connector_id: i32) -> StoreResult<()> {
        if self
            .connectors
            .contains_key(&(charge_point_id.to_string(), connector_id))
        {
            Ok(())
        } else {
            Err(StoreError::not_found(
                "connector",
                "charge_point_id/id",
                format!("{}/{}", charge_point_id, connector_id),
            ))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_rows<T: Clone>(map: &DashMap<i64, T>) -> Vec<T> {
    let mut rows: Vec<(i64, T)> = map.iter().map(|e| (*e.key(), e.value().clone())).collect();
    rows.sort_by_key(|(id, _)| *id);
    rows.into_iter().map(|(_, row)| row).collect()
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn upsert_charge_point(&self, charge_point: ChargePoint) -> StoreResult<()> {
        match self.charge_points.entry(charge_point.id.clone()) {
            Entry::Occupied(mut existing) => {
                let merged = existing.get().merged_with(charge_point);
                existing.insert(merged);
            }
            Entry::Vacant(slot) => {
                slot.insert(charge_point);
            }
        }
        Ok(())
    }

    async fn get_charge_point(&self, id: &str) -> StoreResult<Option<ChargePoint>> {
        Ok(self.charge_points.get(id).map(|cp| cp.clone()))
    }

    async fn list_charge_points(&self) -> StoreResult<Vec<ChargePoint>> {
        let mut all: Vec<ChargePoint> = self.charge_points.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn upsert_connector(&self, connector: Connector) -> StoreResult<()> {
        self.require_charge_point(&connector.charge_point_id)?;
        let key = (connector.charge_point_id.clone(), connector.connector_id);
        match self.connectors.entry(key) {
            Entry::Occupied(mut existing) => {
                let row = existing.get_mut();
                row.status = connector.status;
                row.error_code = connector.error_code;
                row.updated_at = connector.updated_at;
            }
            Entry::Vacant(slot) => {
                slot.insert(connector);
            }
        }
        Ok(())
    }

    async fn get_connector(
        &self,
        charge_point_id: &str,
        connector_id: i32,
    ) -> StoreResult<Option<Connector>> {
        Ok(self
            .connectors
            .get(&(charge_point_id.to_string(), connector_id))
            .map(|c| c.clone()))
    }

    async fn list_connectors(&self, charge_point_id: &str) -> StoreResult<Vec<Connector>> {
        let mut list: Vec<Connector> = self
            .connectors
            .iter()
            .filter(|e| e.key().0 == charge_point_id)
            .map(|e| e.value().clone())
            .collect();
        list.sort_by_key(|c| c.connector_id);
        Ok(list)
    }

    async fn insert_transaction(&self, transaction: Transaction) -> StoreResult<()> {
        self.require_connector(&transaction.charge_point_id, transaction.connector_id)?;
        match self.transactions.entry(transaction.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "transaction {}",
                transaction.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(transaction);
                Ok(())
            }
        }
    }

    async fn complete_transaction(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        meter_stop: i32,
    ) -> StoreResult<StopOutcome> {
        let mut tx = self
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("transaction", "id", id))?;
        if tx.complete(end_time, meter_stop) {
            Ok(StopOutcome::Completed(tx.clone()))
        } else {
            Ok(StopOutcome::AlreadyCompleted(tx.clone()))
        }
    }

    async fn get_transaction(&self, id: i32) -> StoreResult<Option<Transaction>> {
        Ok(self.transactions.get(&id).map(|tx| tx.clone()))
    }

    async fn max_transaction_id(&self) -> StoreResult<Option<i32>> {
        Ok(self.transactions.iter().map(|e| *e.key()).max())
    }

    async fn append_meter_value(&self, meter_value: MeterValue) -> StoreResult<()> {
        self.require_connector(&meter_value.charge_point_id, meter_value.connector_id)?;
        if let Some(tx_id) = meter_value.transaction_id {
            if !self.transactions.contains_key(&tx_id) {
                return Err(StoreError::not_found("transaction", "id", tx_id));
            }
        }
        let row_id = self.next_row_id();
        self.meter_values.insert(row_id, meter_value);
        Ok(())
    }

    async fn append_message(&self, message: OcppMessage) -> StoreResult<()> {
        let row_id = self.next_row_id();
        self.messages.insert(row_id, message);
        Ok(())
    }

    async fn set_connected(
        &self,
        id: &str,
        connected: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut cp = self
            .charge_points
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("charge_point", "id", id))?;
        cp.set_connected(connected, at);
        Ok(())
    }

    async fn update_heartbeat(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut cp = self
            .charge_points
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("charge_point", "id", id))?;
        cp.last_heartbeat = Some(at);
        cp.updated_at = at;
        Ok(())
    }

    async fn reset_connections(&self, at: DateTime<Utc>) -> StoreResult<u64> {
        let mut changed = 0;
        for mut cp in self.charge_points.iter_mut() {
            if cp.is_connected {
                cp.set_connected(false, at);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectorStatus, TransactionStatus};
    use chrono::Duration;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .upsert_charge_point(ChargePoint::unregistered("CP-1", now))
            .await
            .unwrap();
        store
            .upsert_connector(Connector::new("CP-1", 1, ConnectorStatus::Available, "NoError", now))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn duplicate_transaction_id_conflicts() {
        let store = seeded().await;
        let tx = Transaction::start(1001, "CP-1", 1, "TAG1", 100, Utc::now());
        store.insert_transaction(tx.clone()).await.unwrap();
        assert!(matches!(
            store.insert_transaction(tx).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn transaction_requires_existing_connector() {
        let store = seeded().await;
        let tx = Transaction::start(1001, "CP-1", 7, "TAG1", 0, Utc::now());
        assert!(matches!(
            store.insert_transaction(tx).await,
            Err(StoreError::NotFound { entity: "connector", .. })
        ));
    }

    #[tokio::test]
    async fn second_completion_reports_already_completed() {
        let store = seeded().await;
        let t0 = Utc::now();
        store
            .insert_transaction(Transaction::start(1001, "CP-1", 1, "TAG1", 100, t0))
            .await
            .unwrap();

        let t1 = t0 + Duration::minutes(5);
        let first = store.complete_transaction(1001, t1, 500).await.unwrap();
        assert!(matches!(first, StopOutcome::Completed(_)));

        let second = store
            .complete_transaction(1001, t1 + Duration::minutes(1), 900)
            .await
            .unwrap();
        assert!(matches!(second, StopOutcome::AlreadyCompleted(_)));

        let stored = store.get_transaction(1001).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.meter_stop, Some(500));
        assert_eq!(stored.end_time, Some(t1));
    }

    #[tokio::test]
    async fn connectors_listed_in_id_order_and_upserted_in_place() {
        let store = seeded().await;
        let now = Utc::now();
        store
            .upsert_connector(Connector::new("CP-1", 2, ConnectorStatus::Faulted, "GroundFailure", now))
            .await
            .unwrap();
        store
            .upsert_connector(Connector::new("CP-1", 1, ConnectorStatus::Charging, "NoError", now))
            .await
            .unwrap();

        let connectors = store.list_connectors("CP-1").await.unwrap();
        assert_eq!(connectors.len(), 2);
        assert_eq!(connectors[0].connector_id, 1);
        assert_eq!(connectors[0].status, ConnectorStatus::Charging);
        assert_eq!(connectors[1].error_code, "GroundFailure");
    }

    #[tokio::test]
    async fn reset_connections_clears_stale_flags() {
        let store = seeded().await;
        let restart = Utc::now() + Duration::minutes(1);
        assert_eq!(store.reset_connections(restart).await.unwrap(), 1);
        assert_eq!(store.reset_connections(restart).await.unwrap(), 0);

        let cp = store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert!(!cp.is_connected);

        let reconnect = restart + Duration::seconds(5);
        store.set_connected("CP-1", true, reconnect).await.unwrap();
        let cp = store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert_eq!(cp.connected_since, Some(reconnect));
    }

    #[tokio::test]
    async fn heartbeat_for_unknown_charge_point_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.update_heartbeat("ghost", Utc::now()).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
