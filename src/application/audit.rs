//! Protocol audit trail
//!
//! Handlers hand records to a bounded queue and move on; a single writer
//! task persists them through [`StateStore::append_message`]. A full queue
//! drops the record instead of delaying the confirmation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{Direction, MessageKind, OcppMessage, SharedStateStore};

pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;

pub struct AuditLogger {
    sender: mpsc::Sender<OcppMessage>,
    dropped: AtomicU64,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

pub type SharedAuditLogger = Arc<AuditLogger>;

impl AuditLogger {
    /// Start the writer task. Must be called from within a tokio runtime.
    pub fn spawn(store: SharedStateStore, capacity: usize) -> SharedAuditLogger {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();
        let writer = tokio::spawn(run_writer(store, receiver, stop_rx));

        Arc::new(Self {
            sender,
            dropped: AtomicU64::new(0),
            stop: Mutex::new(Some(stop_tx)),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Queue one protocol message. Never blocks.
    pub fn record(
        &self,
        charge_point_id: &str,
        kind: MessageKind,
        direction: Direction,
        action: &str,
        request_id: &str,
        payload: &Value,
    ) {
        let message = OcppMessage {
            charge_point_id: charge_point_id.to_string(),
            kind,
            action: action.to_string(),
            request_id: request_id.to_string(),
            payload: payload.to_string(),
            direction,
            timestamp: Utc::now(),
        };

        match self.sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("ocpp_audit_dropped_total").increment(1);
                warn!(
                    charge_point_id = dropped.charge_point_id.as_str(),
                    action = dropped.action.as_str(),
                    request_id = dropped.request_id.as_str(),
                    "Audit queue full, dropping record"
                );
            }
            Err(TrySendError::Closed(dropped)) => {
                debug!(
                    charge_point_id = dropped.charge_point_id.as_str(),
                    action = dropped.action.as_str(),
                    "Audit writer stopped, record discarded"
                );
            }
        }
    }

    /// Records discarded because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting records and wait until everything already queued has
    /// been written. Later calls return immediately.
    pub async fn shutdown(&self) {
        if let Some(stop) = self.stop.lock().await.take() {
            let _ = stop.send(());
        }
        if let Some(writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.await {
                error!(error = %e, "Audit writer task failed");
            }
        }
    }
}

async fn run_writer(
    store: SharedStateStore,
    mut receiver: mpsc::Receiver<OcppMessage>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            next = receiver.recv() => match next {
                Some(message) => persist(&store, message).await,
                None => return,
            },
            _ = &mut stop => break,
        }
    }

    receiver.close();
    let mut drained = 0usize;
    while let Some(message) = receiver.recv().await {
        persist(&store, message).await;
        drained += 1;
    }
    info!(drained, "Audit writer stopped");
}

async fn persist(store: &SharedStateStore, message: OcppMessage) {
    let charge_point_id = message.charge_point_id.clone();
    let action = message.action.clone();
    if let Err(e) = store.append_message(message).await {
        error!(
            charge_point_id = charge_point_id.as_str(),
            action = action.as_str(),
            error = %e,
            "Failed to persist audit record"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn records_are_persisted_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let audit = AuditLogger::spawn(store.clone(), 16);

        audit.record(
            "CP-1",
            MessageKind::Request,
            Direction::Inbound,
            "Heartbeat",
            "42",
            &json!({}),
        );
        audit.record(
            "CP-1",
            MessageKind::Response,
            Direction::Outbound,
            "Heartbeat",
            "42",
            &json!({"currentTime": "2024-01-01T00:00:00Z"}),
        );
        audit.shutdown().await;

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, MessageKind::Request);
        assert_eq!(messages[0].payload, "{}");
        assert_eq!(messages[1].direction, Direction::Outbound);
        assert_eq!(messages[1].request_id, "42");
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let store = Arc::new(InMemoryStore::new());
        let audit = AuditLogger::spawn(store.clone(), 1);

        // Single-threaded test runtime: the writer cannot run until we yield.
        for i in 0..10 {
            audit.record(
                "CP-1",
                MessageKind::Request,
                Direction::Inbound,
                "Heartbeat",
                &i.to_string(),
                &json!({}),
            );
        }
        assert_eq!(audit.dropped_count(), 9);

        audit.shutdown().await;
        assert_eq!(store.messages().len(), 1);
    }

    #[tokio::test]
    async fn records_after_shutdown_are_discarded() {
        let store = Arc::new(InMemoryStore::new());
        let audit = AuditLogger::spawn(store.clone(), 4);
        audit.shutdown().await;
        audit.shutdown().await;

        audit.record(
            "CP-1",
            MessageKind::Request,
            Direction::Inbound,
            "Heartbeat",
            "1",
            &json!({}),
        );
        assert!(store.messages().is_empty());
        assert_eq!(audit.dropped_count(), 0);
    }
}
