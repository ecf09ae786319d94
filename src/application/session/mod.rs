//! Per-connection session state and the inbound action engine

pub mod actions;
pub mod allocator;
pub mod connection;
pub mod manager;
pub mod policy;
pub mod registry;

use thiserror::Error;

use crate::shared::ocpp_frame::error_code;

pub use actions::{InboundAction, UnknownAction};
pub use allocator::{TransactionIdAllocator, DEFAULT_TRANSACTION_ID_START};
pub use connection::Connection;
pub use manager::{SessionManager, SharedSessionManager, DEFAULT_HEARTBEAT_INTERVAL};
pub use policy::{AcceptAll, AllowList, BootInfo, RegistrationPolicy};
pub use registry::{SessionRegistry, SharedSessionRegistry};

/// Failure to hand a frame to a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("Charge point {0} is not connected")]
    NotConnected(String),

    #[error("Connection to {0} is closing")]
    ChannelClosed(String),
}

/// Inbound Call that cannot be answered with a confirmation. The transport
/// turns it into a CallError frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Action not implemented: {0}")]
    NotImplemented(String),

    #[error("Payload violates the message schema: {0}")]
    FormationViolation(String),

    #[error("Field value out of range: {0}")]
    PropertyConstraintViolation(String),
}

impl ProtocolError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotImplemented(_) => error_code::NOT_IMPLEMENTED,
            Self::FormationViolation(_) => error_code::FORMATION_VIOLATION,
            Self::PropertyConstraintViolation(_) => error_code::PROPERTY_CONSTRAINT_VIOLATION,
        }
    }
}
