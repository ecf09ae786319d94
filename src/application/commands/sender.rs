//! Call/confirmation correlation for outbound commands

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{info, warn};

use super::pending::{Decoder, PendingCommand};
use super::CommandError;
use crate::application::audit::SharedAuditLogger;
use crate::application::session::{SendError, SharedSessionRegistry};
use crate::domain::{Direction, MessageKind};
use crate::shared::ocpp_frame::OcppFrame;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

type PendingKey = (String, String);

struct PendingRequest {
    action: &'static str,
    sent_at: Instant,
    responder: oneshot::Sender<Result<Value, CommandError>>,
    timer: Option<AbortHandle>,
}

impl PendingRequest {
    fn resolve(self, charge_point_id: &str, outcome: Result<Value, CommandError>) {
        if let Some(timer) = &self.timer {
            timer.abort();
        }
        let label = match &outcome {
            Ok(_) => "ok",
            Err(CommandError::CallError { .. }) => "call_error",
            Err(CommandError::Timeout) => "timeout",
            Err(CommandError::Disconnected) => "disconnected",
            Err(_) => "error",
        };
        metrics::histogram!(
            "ocpp_command_latency_seconds",
            "action" => self.action,
            "outcome" => label
        )
        .record(self.sent_at.elapsed().as_secs_f64());

        if self.responder.send(outcome).is_err() {
            info!(
                charge_point_id,
                action = self.action,
                "Command outcome arrived after the caller stopped waiting"
            );
        }
    }
}

/// Sends Call frames to connected charge points and routes the matching
/// CallResult/CallError back to the issuing [`PendingCommand`].
pub struct CommandSender {
    session_registry: SharedSessionRegistry,
    audit: SharedAuditLogger,
    pending_requests: Arc<DashMap<PendingKey, PendingRequest>>,
    message_counter: AtomicU64,
    response_timeout: Duration,
}

pub type SharedCommandSender = Arc<CommandSender>;

impl CommandSender {
    pub fn new(
        session_registry: SharedSessionRegistry,
        audit: SharedAuditLogger,
        response_timeout: Duration,
    ) -> Self {
        Self {
            session_registry,
            audit,
            pending_requests: Arc::new(DashMap::new()),
            message_counter: AtomicU64::new(1),
            response_timeout,
        }
    }

    fn generate_message_id(&self) -> String {
        let id = self.message_counter.fetch_add(1, Ordering::SeqCst);
        format!("CS-{}", id)
    }

    /// Number of commands still waiting for a confirmation.
    pub fn pending_count(&self) -> usize {
        self.pending_requests.len()
    }

    /// Queue a Call frame for `charge_point_id` and return a handle to its
    /// outcome. Fails without touching the connection when the device is
    /// not registered. Must be called from within a tokio runtime.
    pub fn call<T: Send + 'static>(
        &self,
        charge_point_id: &str,
        action: &'static str,
        payload: Value,
        decode: Decoder<T>,
    ) -> Result<PendingCommand<T>, CommandError> {
        if !self.session_registry.is_connected(charge_point_id) {
            return Err(CommandError::NotConnected(charge_point_id.to_string()));
        }

        let message_id = self.generate_message_id();
        let frame = OcppFrame::Call {
            unique_id: message_id.clone(),
            action: action.to_string(),
            payload: payload.clone(),
        };

        let (tx, rx) = oneshot::channel();
        let key = (charge_point_id.to_string(), message_id.clone());
        self.pending_requests.insert(
            key.clone(),
            PendingRequest {
                action,
                sent_at: Instant::now(),
                responder: tx,
                timer: None,
            },
        );

        if let Err(e) = self.session_registry.send_to(charge_point_id, frame.serialize()) {
            self.pending_requests.remove(&key);
            return Err(match e {
                SendError::NotConnected(id) => CommandError::NotConnected(id),
                SendError::ChannelClosed(_) => CommandError::SendFailed(e.to_string()),
            });
        }

        let timer = self.spawn_timeout(key.clone());
        if let Some(mut entry) = self.pending_requests.get_mut(&key) {
            entry.timer = Some(timer);
        }

        info!(
            charge_point_id,
            action,
            message_id = message_id.as_str(),
            "Sending command"
        );
        self.audit.record(
            charge_point_id,
            MessageKind::Request,
            Direction::Outbound,
            action,
            &message_id,
            &payload,
        );

        Ok(PendingCommand::new(
            charge_point_id.to_string(),
            message_id,
            action,
            rx,
            decode,
        ))
    }

    fn spawn_timeout(&self, key: PendingKey) -> AbortHandle {
        let pending_requests = Arc::clone(&self.pending_requests);
        let limit = self.response_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            if let Some(((charge_point_id, message_id), mut pending)) =
                pending_requests.remove(&key)
            {
                warn!(
                    charge_point_id = charge_point_id.as_str(),
                    action = pending.action,
                    message_id = message_id.as_str(),
                    "Command timed out"
                );
                pending.timer = None;
                pending.resolve(&charge_point_id, Err(CommandError::Timeout));
            }
        })
        .abort_handle()
    }

    /// Route a CallResult. Returns `false` for unknown or already resolved ids.
    pub fn handle_response(&self, charge_point_id: &str, message_id: &str, payload: Value) -> bool {
        let key = (charge_point_id.to_string(), message_id.to_string());
        let Some((_, pending)) = self.pending_requests.remove(&key) else {
            warn!(
                charge_point_id,
                message_id, "Received response for unknown request"
            );
            return false;
        };

        info!(
            charge_point_id,
            action = pending.action,
            message_id,
            "Received response"
        );
        self.audit.record(
            charge_point_id,
            MessageKind::Response,
            Direction::Inbound,
            pending.action,
            message_id,
            &payload,
        );
        pending.resolve(charge_point_id, Ok(payload));
        true
    }

    /// Route a CallError. Returns `false` for unknown or already resolved ids.
    pub fn handle_error(
        &self,
        charge_point_id: &str,
        message_id: &str,
        error_code: &str,
        error_description: &str,
    ) -> bool {
        let key = (charge_point_id.to_string(), message_id.to_string());
        let Some((_, pending)) = self.pending_requests.remove(&key) else {
            warn!(
                charge_point_id,
                message_id, error_code, "Received error for unknown request"
            );
            return false;
        };

        warn!(
            charge_point_id,
            action = pending.action,
            message_id,
            error_code,
            error_description,
            "Charge point rejected command"
        );
        self.audit.record(
            charge_point_id,
            MessageKind::Response,
            Direction::Inbound,
            pending.action,
            message_id,
            &json!({ "errorCode": error_code, "errorDescription": error_description }),
        );
        pending.resolve(
            charge_point_id,
            Err(CommandError::CallError {
                code: error_code.to_string(),
                description: error_description.to_string(),
            }),
        );
        true
    }

    /// Fail every command still waiting on `charge_point_id` with
    /// [`CommandError::Disconnected`]. Returns how many were failed.
    pub fn cleanup_charge_point(&self, charge_point_id: &str) -> usize {
        let keys: Vec<PendingKey> = self
            .pending_requests
            .iter()
            .filter(|entry| entry.key().0 == charge_point_id)
            .map(|entry| entry.key().clone())
            .collect();

        let mut failed = 0;
        for key in keys {
            if let Some((_, pending)) = self.pending_requests.remove(&key) {
                pending.resolve(charge_point_id, Err(CommandError::Disconnected));
                failed += 1;
            }
        }
        if failed > 0 {
            info!(charge_point_id, failed, "Failed pending commands on disconnect");
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::audit::AuditLogger;
    use crate::application::session::SessionRegistry;
    use crate::infrastructure::storage::InMemoryStore;
    use tokio::sync::mpsc;

    fn raw(payload: Value) -> Result<Value, CommandError> {
        Ok(payload)
    }

    fn sender_with(
        timeout: Duration,
    ) -> (
        CommandSender,
        SharedSessionRegistry,
        mpsc::UnboundedReceiver<String>,
    ) {
        let registry = SessionRegistry::shared();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("CP-1", tx);
        let audit = AuditLogger::spawn(Arc::new(InMemoryStore::new()), 64);
        (CommandSender::new(registry.clone(), audit, timeout), registry, rx)
    }

    fn sent_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> (String, String) {
        match OcppFrame::parse(&rx.try_recv().unwrap()).unwrap() {
            OcppFrame::Call {
                unique_id, action, ..
            } => (unique_id, action),
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn offline_device_fails_without_sending() {
        let (sender, _registry, mut rx) = sender_with(DEFAULT_COMMAND_TIMEOUT);
        let result = sender.call("CP-2", "Reset", json!({"type": "Hard"}), raw);
        assert!(matches!(result, Err(CommandError::NotConnected(id)) if id == "CP-2"));
        assert!(rx.try_recv().is_err());
        assert_eq!(sender.pending_count(), 0);
    }

    #[tokio::test]
    async fn response_resolves_matching_call() {
        let (sender, _registry, mut rx) = sender_with(DEFAULT_COMMAND_TIMEOUT);
        let pending = sender
            .call("CP-1", "ClearCache", json!({}), raw)
            .unwrap();
        let (message_id, action) = sent_frame(&mut rx);
        assert_eq!(action, "ClearCache");
        assert_eq!(pending.message_id(), message_id);
        assert!(message_id.starts_with("CS-"));

        assert!(!sender.handle_response("CP-1", "CS-999", json!({})));
        assert!(sender.handle_response("CP-1", &message_id, json!({"status": "Accepted"})));
        assert_eq!(pending.wait().await.unwrap()["status"], "Accepted");
        assert!(!sender.handle_response("CP-1", &message_id, json!({})));
    }

    #[tokio::test]
    async fn call_error_is_surfaced() {
        let (sender, _registry, mut rx) = sender_with(DEFAULT_COMMAND_TIMEOUT);
        let pending = sender.call("CP-1", "Reset", json!({}), raw).unwrap();
        let (message_id, _) = sent_frame(&mut rx);

        sender.handle_error("CP-1", &message_id, "NotSupported", "nope");
        assert_eq!(
            pending.wait().await.unwrap_err(),
            CommandError::CallError {
                code: "NotSupported".into(),
                description: "nope".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_call_times_out() {
        let (sender, _registry, _rx) = sender_with(Duration::from_secs(30));
        let pending = sender.call("CP-1", "Reset", json!({}), raw).unwrap();
        assert_eq!(pending.wait().await.unwrap_err(), CommandError::Timeout);
        assert_eq!(sender.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_deadline_is_independent_of_transport_timeout() {
        let (sender, _registry, mut rx) = sender_with(Duration::from_secs(30));
        let pending = sender.call("CP-1", "Reset", json!({}), raw).unwrap();
        let (message_id, _) = sent_frame(&mut rx);

        let outcome = pending.wait_timeout(Duration::from_secs(1)).await;
        assert_eq!(outcome.unwrap_err(), CommandError::Timeout);

        // Entry is still tracked; the late confirmation is consumed quietly.
        assert_eq!(sender.pending_count(), 1);
        assert!(sender.handle_response("CP-1", &message_id, json!({})));
    }

    #[tokio::test]
    async fn disconnect_fails_pending_commands() {
        let (sender, registry, _rx) = sender_with(DEFAULT_COMMAND_TIMEOUT);
        let first = sender.call("CP-1", "Reset", json!({}), raw).unwrap();
        let second = sender.call("CP-1", "ClearCache", json!({}), raw).unwrap();

        registry.unregister("CP-1", 1);
        assert_eq!(sender.cleanup_charge_point("CP-1"), 2);
        assert_eq!(first.wait().await.unwrap_err(), CommandError::Disconnected);
        assert_eq!(second.wait().await.unwrap_err(), CommandError::Disconnected);
    }

    #[tokio::test]
    async fn continuation_runs_once_with_outcome() {
        let (sender, _registry, mut rx) = sender_with(DEFAULT_COMMAND_TIMEOUT);
        let (done_tx, done_rx) = oneshot::channel();
        let handle = sender
            .call("CP-1", "Reset", json!({}), raw)
            .unwrap()
            .on_complete(move |outcome| {
                let _ = done_tx.send(outcome);
            });

        let (message_id, _) = sent_frame(&mut rx);
        sender.handle_response("CP-1", &message_id, json!({"status": "Rejected"}));
        handle.await.unwrap();
        assert_eq!(done_rx.await.unwrap().unwrap()["status"], "Rejected");
    }
}
