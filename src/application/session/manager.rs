//! Session Manager: connection lifecycle and inbound action dispatch

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{
    AcceptAll, InboundAction, ProtocolError, RegistrationPolicy, TransactionIdAllocator,
};
use crate::application::audit::SharedAuditLogger;
use crate::application::handlers::{self, InboundContext};
use crate::domain::{ChargePoint, Direction, MessageKind, SharedStateStore};

pub const DEFAULT_HEARTBEAT_INTERVAL: i32 = 600;

/// Maps inbound protocol events to state transitions and confirmations.
///
/// Everything durable goes through the store, so one instance serves every
/// connection task concurrently. The only per-device state is a lock that
/// orders connect and disconnect writes for the same id.
pub struct SessionManager {
    store: SharedStateStore,
    audit: SharedAuditLogger,
    allocator: Arc<TransactionIdAllocator>,
    policy: Arc<dyn RegistrationPolicy>,
    heartbeat_interval: i32,
    lifecycle: DashMap<String, Arc<Mutex<()>>>,
}

pub type SharedSessionManager = Arc<SessionManager>;

impl SessionManager {
    pub fn new(
        store: SharedStateStore,
        audit: SharedAuditLogger,
        allocator: Arc<TransactionIdAllocator>,
    ) -> Self {
        Self {
            store,
            audit,
            allocator,
            policy: Arc::new(AcceptAll),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            lifecycle: DashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn RegistrationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_heartbeat_interval(mut self, seconds: i32) -> Self {
        self.heartbeat_interval = seconds;
        self
    }

    pub(crate) fn store(&self) -> &SharedStateStore {
        &self.store
    }

    pub(crate) fn allocator(&self) -> &TransactionIdAllocator {
        &self.allocator
    }

    pub(crate) fn policy(&self) -> &dyn RegistrationPolicy {
        self.policy.as_ref()
    }

    pub(crate) fn heartbeat_interval(&self) -> i32 {
        self.heartbeat_interval
    }

    fn lifecycle_lock(&self, charge_point_id: &str) -> Arc<Mutex<()>> {
        self.lifecycle
            .entry(charge_point_id.to_string())
            .or_default()
            .clone()
    }

    /// A transport connection was established for `charge_point_id`.
    pub async fn connect(&self, charge_point_id: &str) {
        let lock = self.lifecycle_lock(charge_point_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let result = match self.store.get_charge_point(charge_point_id).await {
            Ok(Some(_)) => self.store.set_connected(charge_point_id, true, now).await,
            Ok(None) => {
                info!(charge_point_id, "New charge point, creating pending record");
                self.store
                    .upsert_charge_point(ChargePoint::unregistered(charge_point_id, now))
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            error!(charge_point_id, error = %e, "Failed to record connect");
        }
    }

    /// A transport connection for `charge_point_id` closed.
    ///
    /// `release` runs under the same per-device lock as [`connect`](Self::connect)
    /// and reports whether the closing connection still owned the session.
    /// When it returns `false` a newer connection has taken over and the
    /// stored flag is left alone. Returns what `release` returned.
    pub async fn disconnect<F>(&self, charge_point_id: &str, release: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let lock = self.lifecycle_lock(charge_point_id);
        let _guard = lock.lock().await;

        if !release() {
            return false;
        }
        if let Err(e) = self
            .store
            .set_connected(charge_point_id, false, Utc::now())
            .await
        {
            error!(charge_point_id, error = %e, "Failed to record disconnect");
        }
        true
    }

    /// Process one inbound Call and produce its confirmation payload.
    ///
    /// Store failures never surface here; only unknown actions and
    /// undecodable payloads are reported as [`ProtocolError`].
    pub async fn handle(
        &self,
        charge_point_id: &str,
        unique_id: &str,
        action: &str,
        payload: Value,
    ) -> Result<Value, ProtocolError> {
        let start = Instant::now();
        self.audit.record(
            charge_point_id,
            MessageKind::Request,
            Direction::Inbound,
            action,
            unique_id,
            &payload,
        );

        let result = match action.parse::<InboundAction>() {
            Ok(inbound) => {
                let ctx = InboundContext {
                    charge_point_id,
                    manager: self,
                };
                handlers::dispatch(&ctx, inbound, &payload).await
            }
            Err(e) => {
                warn!(charge_point_id, action, "Unsupported inbound action");
                Err(ProtocolError::NotImplemented(e.0))
            }
        };

        let response = match &result {
            Ok(confirmation) => confirmation.clone(),
            Err(e) => json!({
                "errorCode": e.error_code(),
                "errorDescription": e.to_string(),
            }),
        };
        self.audit.record(
            charge_point_id,
            MessageKind::Response,
            Direction::Outbound,
            action,
            unique_id,
            &response,
        );

        let label = action
            .parse::<InboundAction>()
            .map_or("unsupported", |a| a.as_str());
        metrics::counter!("ocpp_inbound_messages_total", "action" => label).increment(1);
        metrics::histogram!("ocpp_inbound_latency_seconds", "action" => label)
            .record(start.elapsed().as_secs_f64());

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use chrono::{DateTime, TimeZone};
    use metrics::{
        Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use tokio::sync::mpsc;

    use super::*;
    use crate::application::audit::AuditLogger;
    use crate::application::session::{AllowList, SessionRegistry};
    use crate::domain::{
        ConnectorStatus, RegistrationStatus, StateStore, TransactionStatus, DEFAULT_MEASURAND,
        DEFAULT_UNIT,
    };
    use crate::infrastructure::storage::scripted::{Failure, ScriptedStore, Write};
    use crate::infrastructure::storage::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        audit: SharedAuditLogger,
        manager: SessionManager,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let audit = AuditLogger::spawn(store.clone(), 256);
        let manager = SessionManager::new(
            store.clone(),
            audit.clone(),
            Arc::new(TransactionIdAllocator::new(1000)),
        );
        Fixture {
            store,
            audit,
            manager,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    async fn boot(manager: &SessionManager, id: &str) -> Value {
        manager.connect(id).await;
        manager
            .handle(
                id,
                "1",
                "BootNotification",
                json!({"chargePointVendor": "Acme", "chargePointModel": "X1"}),
            )
            .await
            .unwrap()
    }

    async fn start_tx(manager: &SessionManager, id: &str, connector: u32, meter: i32) -> i32 {
        let response = manager
            .handle(
                id,
                "2",
                "StartTransaction",
                json!({
                    "connectorId": connector,
                    "idTag": "TAG1",
                    "meterStart": meter,
                    "timestamp": at(0).to_rfc3339(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(response["idTagInfo"]["status"], "Accepted");
        response["transactionId"].as_i64().unwrap() as i32
    }

    #[tokio::test]
    async fn connect_twice_keeps_connected_since() {
        let f = fixture();
        f.manager.connect("CP-1").await;
        let first = f.store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert_eq!(first.registration_status, RegistrationStatus::Pending);
        assert_eq!(first.vendor, "Unknown");

        tokio::time::sleep(Duration::from_millis(5)).await;
        f.manager.connect("CP-1").await;
        let second = f.store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert_eq!(second.connected_since, first.connected_since);
        assert!(second.is_connected);

        assert!(f.manager.disconnect("CP-1", || true).await);
        let third = f.store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert!(!third.is_connected);
        assert_eq!(third.connected_since, first.connected_since);
    }

    #[tokio::test]
    async fn boot_notification_registers_identity() {
        let f = fixture();
        let response = boot(&f.manager, "CP-1").await;
        assert_eq!(response["status"], "Accepted");
        assert_eq!(response["interval"], DEFAULT_HEARTBEAT_INTERVAL);
        assert!(response["currentTime"].is_string());

        let cp = f.store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert_eq!(cp.vendor, "Acme");
        assert_eq!(cp.model, "X1");
        assert_eq!(cp.registration_status, RegistrationStatus::Accepted);
        assert!(cp.is_connected);
        assert!(cp.last_heartbeat.is_some());
    }

    #[tokio::test]
    async fn boot_replay_does_not_move_connected_since() {
        let f = fixture();
        boot(&f.manager, "CP-1").await;
        let before = f.store.get_charge_point("CP-1").await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        boot(&f.manager, "CP-1").await;
        let after = f.store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert_eq!(after.connected_since, before.connected_since);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn allow_list_policy_rejects_unknown_devices() {
        let store = Arc::new(InMemoryStore::new());
        let audit = AuditLogger::spawn(store.clone(), 16);
        let manager = SessionManager::new(
            store.clone(),
            audit,
            Arc::new(TransactionIdAllocator::default()),
        )
        .with_policy(Arc::new(AllowList::new(["CP-1"])))
        .with_heartbeat_interval(120);

        let response = boot(&manager, "CP-9").await;
        assert_eq!(response["status"], "Rejected");
        assert_eq!(response["interval"], 120);

        let cp = store.get_charge_point("CP-9").await.unwrap().unwrap();
        assert_eq!(cp.registration_status, RegistrationStatus::Rejected);
        assert_eq!(cp.vendor, "Acme");
    }

    #[tokio::test]
    async fn heartbeat_only_touches_last_heartbeat() {
        let f = fixture();
        f.manager.connect("CP-1").await;
        let before = f.store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert!(before.last_heartbeat.is_none());

        let response = f
            .manager
            .handle("CP-1", "9", "Heartbeat", json!({}))
            .await
            .unwrap();
        assert!(response["currentTime"].is_string());

        let after = f.store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert!(after.last_heartbeat.is_some());
        assert_eq!(after.registration_status, before.registration_status);
    }

    #[tokio::test]
    async fn status_notification_upserts_unknown_connector() {
        let f = fixture();
        f.manager.connect("CP-1").await;

        let response = f
            .manager
            .handle(
                "CP-1",
                "3",
                "StatusNotification",
                json!({"connectorId": 7, "errorCode": "NoError", "status": "Charging"}),
            )
            .await
            .unwrap();
        assert_eq!(response, json!({}));

        f.manager
            .handle(
                "CP-1",
                "4",
                "StatusNotification",
                json!({"connectorId": 7, "errorCode": "GroundFailure", "status": "Faulted"}),
            )
            .await
            .unwrap();

        let connectors = f.store.list_connectors("CP-1").await.unwrap();
        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].connector_id, 7);
        assert_eq!(connectors[0].status, ConnectorStatus::Faulted);
        assert_eq!(connectors[0].error_code, "GroundFailure");
    }

    #[tokio::test]
    async fn start_then_stop_completes_transaction() {
        let f = fixture();
        boot(&f.manager, "CP-1").await;

        let tx_id = start_tx(&f.manager, "CP-1", 1, 100).await;
        assert_eq!(tx_id, 1001);

        let stored = f.store.get_transaction(tx_id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::InProgress);
        assert_eq!(stored.meter_start, 100);
        assert_eq!(stored.id_tag, "TAG1");

        let response = f
            .manager
            .handle(
                "CP-1",
                "5",
                "StopTransaction",
                json!({
                    "transactionId": tx_id,
                    "meterStop": 250,
                    "timestamp": at(60).to_rfc3339(),
                }),
            )
            .await
            .unwrap();
        assert!(response.is_object());

        let stored = f.store.get_transaction(tx_id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.meter_stop, Some(250));
        assert_eq!(stored.end_time, Some(at(60)));
    }

    #[tokio::test]
    async fn double_stop_is_idempotent() {
        let f = fixture();
        boot(&f.manager, "CP-1").await;
        let tx_id = start_tx(&f.manager, "CP-1", 1, 100).await;

        let stop = |meter: i32, secs: i64| {
            json!({
                "transactionId": tx_id,
                "meterStop": meter,
                "timestamp": at(secs).to_rfc3339(),
                "transactionData": [{
                    "timestamp": at(secs).to_rfc3339(),
                    "sampledValue": [{"value": meter.to_string()}],
                }],
            })
        };

        f.manager
            .handle("CP-1", "6", "StopTransaction", stop(500, 60))
            .await
            .unwrap();
        let replay = f
            .manager
            .handle("CP-1", "7", "StopTransaction", stop(900, 120))
            .await;
        assert!(replay.is_ok());

        let stored = f.store.get_transaction(tx_id).await.unwrap().unwrap();
        assert_eq!(stored.meter_stop, Some(500));
        assert_eq!(stored.end_time, Some(at(60)));
        assert_eq!(f.store.max_transaction_id().await.unwrap(), Some(tx_id));

        let samples = f.store.meter_values();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 500.0);
        assert_eq!(samples[0].connector_id, 0);
        assert_eq!(samples[0].transaction_id, Some(tx_id));
    }

    #[tokio::test]
    async fn stop_for_unknown_transaction_still_confirms() {
        let f = fixture();
        boot(&f.manager, "CP-1").await;
        let response = f
            .manager
            .handle(
                "CP-1",
                "8",
                "StopTransaction",
                json!({"transactionId": 4242, "meterStop": 1, "timestamp": at(0).to_rfc3339()}),
            )
            .await;
        assert!(response.is_ok());
        assert!(f.store.get_transaction(4242).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn meter_values_default_and_zero_fill() {
        let f = fixture();
        boot(&f.manager, "CP-1").await;
        let tx_id = start_tx(&f.manager, "CP-1", 2, 0).await;

        let response = f
            .manager
            .handle(
                "CP-1",
                "10",
                "MeterValues",
                json!({
                    "connectorId": 2,
                    "transactionId": tx_id,
                    "meterValue": [{
                        "timestamp": at(30).to_rfc3339(),
                        "sampledValue": [
                            {"value": "1234.5"},
                            {"value": "not-a-number", "measurand": "Power.Active.Import", "unit": "W"},
                        ],
                    }],
                }),
            )
            .await
            .unwrap();
        assert_eq!(response, json!({}));

        let samples = f.store.meter_values();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 1234.5);
        assert_eq!(samples[0].measurand, DEFAULT_MEASURAND);
        assert_eq!(samples[0].unit, DEFAULT_UNIT);
        assert_eq!(samples[0].timestamp, at(30));
        assert_eq!(samples[1].value, 0.0);
        assert_eq!(samples[1].measurand, "Power.Active.Import");
        assert_eq!(samples[1].unit, "W");
        assert!(samples.iter().all(|s| s.transaction_id == Some(tx_id)));
    }

    #[tokio::test]
    async fn authorize_and_data_transfer_always_accept() {
        let f = fixture();
        f.manager.connect("CP-1").await;

        let auth = f
            .manager
            .handle("CP-1", "11", "Authorize", json!({"idTag": "ANY"}))
            .await
            .unwrap();
        assert_eq!(auth["idTagInfo"]["status"], "Accepted");

        let transfer = f
            .manager
            .handle(
                "CP-1",
                "12",
                "DataTransfer",
                json!({"vendorId": "acme", "messageId": "x", "data": "{}"}),
            )
            .await
            .unwrap();
        assert_eq!(transfer["status"], "Accepted");
        assert!(transfer.get("data").map_or(true, Value::is_null));
    }

    #[tokio::test]
    async fn firmware_and_diagnostics_notifications_confirm_empty() {
        let f = fixture();
        f.manager.connect("CP-1").await;
        let diag = f
            .manager
            .handle(
                "CP-1",
                "13",
                "DiagnosticsStatusNotification",
                json!({"status": "Uploaded"}),
            )
            .await
            .unwrap();
        let firmware = f
            .manager
            .handle(
                "CP-1",
                "14",
                "FirmwareStatusNotification",
                json!({"status": "Installed"}),
            )
            .await
            .unwrap();
        assert_eq!(diag, json!({}));
        assert_eq!(firmware, json!({}));
    }

    #[tokio::test]
    async fn unknown_action_and_bad_payload_are_protocol_errors() {
        let f = fixture();
        f.manager.connect("CP-1").await;

        let unknown = f
            .manager
            .handle("CP-1", "15", "RemoteStartTransaction", json!({}))
            .await;
        assert!(matches!(unknown, Err(ProtocolError::NotImplemented(a)) if a == "RemoteStartTransaction"));

        let malformed = f
            .manager
            .handle("CP-1", "16", "StartTransaction", json!({"connectorId": "one"}))
            .await;
        assert!(matches!(malformed, Err(ProtocolError::FormationViolation(_))));
    }

    #[tokio::test]
    async fn request_and_response_are_audited_in_order() {
        let f = fixture();
        f.manager.connect("CP-1").await;
        f.manager
            .handle("CP-1", "abc", "Heartbeat", json!({}))
            .await
            .unwrap();
        f.audit.shutdown().await;

        let messages = f.store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, MessageKind::Request);
        assert_eq!(messages[0].direction, Direction::Inbound);
        assert_eq!(messages[1].kind, MessageKind::Response);
        assert_eq!(messages[1].direction, Direction::Outbound);
        assert!(messages.iter().all(|m| m.request_id == "abc" && m.action == "Heartbeat"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_across_devices_get_distinct_ids() {
        let f = fixture();
        let manager = Arc::new(f.manager);
        for i in 0..4 {
            boot(&manager, &format!("CP-{i}")).await;
        }

        let mut tasks = Vec::new();
        for i in 0..4 {
            let manager = manager.clone();
            tasks.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..10 {
                    ids.push(start_tx(&manager, &format!("CP-{i}"), 1, 0).await);
                }
                ids
            }));
        }

        let mut all = Vec::new();
        for task in tasks {
            let ids = task.await.unwrap();
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            all.extend(ids);
        }
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 40);
        assert!(all[0] > 1000);
    }

    fn scripted() -> (Arc<ScriptedStore>, Arc<SessionManager>) {
        let store = Arc::new(ScriptedStore::new());
        let audit = AuditLogger::spawn(store.clone(), 256);
        let manager = SessionManager::new(
            store.clone(),
            audit,
            Arc::new(TransactionIdAllocator::new(1000)),
        );
        (store, Arc::new(manager))
    }

    /// Counts `ocpp_store_errors_total` increments; every other metric is a no-op.
    #[derive(Default)]
    struct StoreErrorRecorder(Arc<Hits>);

    #[derive(Default)]
    struct Hits(AtomicU64);

    impl StoreErrorRecorder {
        fn hits(&self) -> u64 {
            self.0 .0.load(Ordering::SeqCst)
        }
    }

    impl CounterFn for Hits {
        fn increment(&self, value: u64) {
            self.0.fetch_add(value, Ordering::SeqCst);
        }
        fn absolute(&self, value: u64) {
            self.0.fetch_max(value, Ordering::SeqCst);
        }
    }

    impl Recorder for StoreErrorRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            if key.name() == "ocpp_store_errors_total" {
                Counter::from_arc(self.0.clone())
            } else {
                Counter::noop()
            }
        }
        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }
        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[tokio::test]
    async fn failing_store_still_confirms_every_action() {
        let recorder = StoreErrorRecorder::default();
        let _metrics = metrics::set_default_local_recorder(&recorder);

        let (store, manager) = scripted();
        store.fail_with(Some(Failure::Database));
        manager.connect("CP-1").await;

        let boot = manager
            .handle(
                "CP-1",
                "1",
                "BootNotification",
                json!({"chargePointVendor": "Acme", "chargePointModel": "X1"}),
            )
            .await
            .unwrap();
        assert_eq!(boot["status"], "Accepted");
        assert_eq!(boot["interval"], DEFAULT_HEARTBEAT_INTERVAL);

        let start = manager
            .handle(
                "CP-1",
                "2",
                "StartTransaction",
                json!({
                    "connectorId": 1,
                    "idTag": "TAG1",
                    "meterStart": 100,
                    "timestamp": at(0).to_rfc3339(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(start["transactionId"], 1001);
        assert_eq!(start["idTagInfo"]["status"], "Accepted");

        store.fail_with(Some(Failure::Timeout));
        let meter = manager
            .handle(
                "CP-1",
                "3",
                "MeterValues",
                json!({
                    "connectorId": 1,
                    "transactionId": 1001,
                    "meterValue": [{
                        "timestamp": at(30).to_rfc3339(),
                        "sampledValue": [{"value": "150"}],
                    }],
                }),
            )
            .await
            .unwrap();
        assert_eq!(meter, json!({}));

        let stop = manager
            .handle(
                "CP-1",
                "4",
                "StopTransaction",
                json!({
                    "transactionId": 1001,
                    "idTag": "TAG1",
                    "meterStop": 250,
                    "timestamp": at(60).to_rfc3339(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(stop["idTagInfo"]["status"], "Accepted");

        let heartbeat = manager
            .handle("CP-1", "5", "Heartbeat", json!({}))
            .await
            .unwrap();
        assert!(heartbeat["currentTime"].is_string());

        // One swallowed failure per action.
        assert_eq!(recorder.hits(), 5);

        store.fail_with(None);
        assert!(store.inner().get_charge_point("CP-1").await.unwrap().is_none());
        assert!(store.inner().get_transaction(1001).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reconnect_during_slow_disconnect_stays_connected() {
        let (store, manager) = scripted();
        let registry = SessionRegistry::shared();

        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let old = registry.register("CP-1", old_tx);
        manager.connect("CP-1").await;
        let first = store.inner().get_charge_point("CP-1").await.unwrap().unwrap();

        store.hold_next(Write::Connection);
        let closing = {
            let manager = manager.clone();
            let registry = registry.clone();
            tokio::spawn(async move {
                manager
                    .disconnect("CP-1", || registry.unregister("CP-1", old))
                    .await
            })
        };
        store.held().await;

        let (new_tx, _new_rx) = mpsc::unbounded_channel();
        registry.register("CP-1", new_tx);
        let reconnecting = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.connect("CP-1").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.release();

        assert!(closing.await.unwrap());
        reconnecting.await.unwrap();

        let cp = store.inner().get_charge_point("CP-1").await.unwrap().unwrap();
        assert!(cp.is_connected);
        assert!(cp.connected_since > first.connected_since);
        assert!(registry.is_connected("CP-1"));
    }

    #[tokio::test]
    async fn replaced_connection_close_leaves_flag_alone() {
        let f = fixture();
        let registry = SessionRegistry::new();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, _new_rx) = mpsc::unbounded_channel();

        let old = registry.register("CP-1", old_tx);
        f.manager.connect("CP-1").await;
        registry.register("CP-1", new_tx);
        f.manager.connect("CP-1").await;

        let released = f
            .manager
            .disconnect("CP-1", || registry.unregister("CP-1", old))
            .await;
        assert!(!released);

        let cp = f.store.get_charge_point("CP-1").await.unwrap().unwrap();
        assert!(cp.is_connected);
    }

    #[tokio::test]
    async fn connector_id_beyond_i32_is_a_constraint_violation() {
        let f = fixture();
        f.manager.connect("CP-1").await;

        let result = f
            .manager
            .handle(
                "CP-1",
                "17",
                "StatusNotification",
                json!({"connectorId": 4_294_967_295u64, "errorCode": "NoError", "status": "Available"}),
            )
            .await;
        assert!(matches!(result, Err(ProtocolError::PropertyConstraintViolation(_))));
        assert!(f.store.list_connectors("CP-1").await.unwrap().is_empty());
    }
}
