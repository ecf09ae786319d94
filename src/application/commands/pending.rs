//! Handle to an outstanding command

use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::CommandError;

pub(crate) type Decoder<T> = fn(Value) -> Result<T, CommandError>;

/// Resolves exactly once with the decoded confirmation or a
/// [`CommandError`]. Dropping it only drops interest in the outcome; the
/// command itself stays in flight until answered or timed out.
#[must_use = "a command's outcome is lost unless awaited or given a continuation"]
pub struct PendingCommand<T> {
    charge_point_id: String,
    message_id: String,
    action: &'static str,
    receiver: oneshot::Receiver<Result<Value, CommandError>>,
    decode: Decoder<T>,
}

impl<T: Send + 'static> PendingCommand<T> {
    pub(crate) fn new(
        charge_point_id: String,
        message_id: String,
        action: &'static str,
        receiver: oneshot::Receiver<Result<Value, CommandError>>,
        decode: Decoder<T>,
    ) -> Self {
        Self {
            charge_point_id,
            message_id,
            action,
            receiver,
            decode,
        }
    }

    pub fn charge_point_id(&self) -> &str {
        &self.charge_point_id
    }

    /// Unique id of the Call frame on the wire.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    /// Wait for the outcome, bounded only by the sender's own timeout.
    pub async fn wait(self) -> Result<T, CommandError> {
        match self.receiver.await {
            Ok(outcome) => outcome.and_then(self.decode),
            Err(_) => Err(CommandError::Disconnected),
        }
    }

    /// Wait at most `limit`. Expiry reports [`CommandError::Timeout`] to
    /// this caller only; a late confirmation is still consumed by the sender.
    pub async fn wait_timeout(self, limit: Duration) -> Result<T, CommandError> {
        tokio::time::timeout(limit, self.wait())
            .await
            .map_err(|_| CommandError::Timeout)?
    }

    /// Run `continuation` with the outcome on a separate task.
    pub fn on_complete<F>(self, continuation: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<T, CommandError>) + Send + 'static,
    {
        tokio::spawn(async move { continuation(self.wait().await) })
    }
}
