//! Directory of connected charge points

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::Connection;
use super::SendError;

/// Thread-safe registry of live sessions, keyed by charge point id.
pub struct SessionRegistry {
    sessions: DashMap<String, Connection>,
    next_connection_id: AtomicU64,
}

pub type SharedSessionRegistry = Arc<SessionRegistry>;

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
        }
    }

    pub fn shared() -> SharedSessionRegistry {
        Arc::new(Self::new())
    }

    /// Register a connection and return its generation number. An existing
    /// session for the same id is replaced.
    pub fn register(&self, charge_point_id: &str, sender: mpsc::UnboundedSender<String>) -> u64 {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        let connection = Connection::new(connection_id, charge_point_id, sender);

        if let Some(previous) = self.sessions.insert(charge_point_id.to_string(), connection) {
            warn!(
                charge_point_id,
                previous_connection_id = previous.connection_id,
                connection_id,
                "Replacing existing session"
            );
        } else {
            info!(charge_point_id, connection_id, "Registered charge point session");
        }
        connection_id
    }

    /// Remove the session only if it still belongs to `connection_id`.
    /// Returns `false` when a newer connection has taken the slot.
    pub fn unregister(&self, charge_point_id: &str, connection_id: u64) -> bool {
        let removed = self
            .sessions
            .remove_if(charge_point_id, |_, conn| conn.connection_id == connection_id)
            .is_some();
        if removed {
            info!(charge_point_id, connection_id, "Unregistered charge point session");
        } else {
            debug!(
                charge_point_id,
                connection_id, "Session already replaced or removed"
            );
        }
        removed
    }

    pub fn send_to(&self, charge_point_id: &str, frame: String) -> Result<(), SendError> {
        match self.sessions.get(charge_point_id) {
            Some(conn) => conn.send(frame),
            None => Err(SendError::NotConnected(charge_point_id.to_string())),
        }
    }

    pub fn is_connected(&self, charge_point_id: &str) -> bool {
        self.sessions.contains_key(charge_point_id)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_to_unknown_id_is_not_connected() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.send_to("CP-2", "x".into()),
            Err(SendError::NotConnected(id)) if id == "CP-2"
        ));
    }

    #[test]
    fn stale_unregister_keeps_replacement_session() {
        let registry = SessionRegistry::new();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        let first = registry.register("CP-1", old_tx);
        let second = registry.register("CP-1", new_tx);
        assert_ne!(first, second);
        assert_eq!(registry.count(), 1);

        assert!(!registry.unregister("CP-1", first));
        assert!(registry.is_connected("CP-1"));

        registry.send_to("CP-1", "hello".into()).unwrap();
        assert_eq!(new_rx.try_recv().unwrap(), "hello");

        assert!(registry.unregister("CP-1", second));
        assert!(!registry.is_connected("CP-1"));
    }
}
