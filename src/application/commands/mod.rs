//! Central system → charge point commands
//!
//! ```text
//! REST handler ──► CommandDispatcher ──► v16::* (typed request + decoder)
//!                                           │
//!                                    CommandSender::call ──► SessionRegistry::send_to
//!                                           │
//!                                    PendingCommand<T> ◄── handle_response / handle_error
//!                                                       ◄── timer (Timeout) / cleanup (Disconnected)
//! ```

pub mod dispatcher;
pub mod pending;
pub mod sender;
pub mod v16;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use dispatcher::{CommandDispatcher, SharedCommandDispatcher};
pub use pending::PendingCommand;
pub use sender::{CommandSender, SharedCommandSender, DEFAULT_COMMAND_TIMEOUT};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Charge point not connected: {0}")]
    NotConnected(String),

    #[error("Failed to send: {0}")]
    SendFailed(String),

    #[error("Response timeout")]
    Timeout,

    #[error("Charge point disconnected before responding")]
    Disconnected,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("CallError {code}: {description}")]
    CallError { code: String, description: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    Soft,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Operative,
    Inoperative,
}

/// Messages the central system may ask a charge point to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerType {
    Heartbeat,
    StatusNotification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub readonly: bool,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigurationResult {
    pub configuration_key: Vec<KeyValue>,
    pub unknown_key: Vec<String>,
}

fn encode<T: Serialize>(request: &T) -> Result<Value, CommandError> {
    serde_json::to_value(request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, CommandError> {
    serde_json::from_value(payload)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

/// Protocol spelling of a response status enum.
fn status_text<T: Serialize + std::fmt::Debug>(status: &T) -> String {
    match serde_json::to_value(status) {
        Ok(Value::String(s)) => s,
        _ => format!("{:?}", status),
    }
}
