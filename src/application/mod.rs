//! Session & state engine: inbound handling, outbound commands, audit.

pub mod audit;
pub mod commands;
pub mod handlers;
pub mod session;

pub use audit::{AuditLogger, SharedAuditLogger, DEFAULT_AUDIT_QUEUE_CAPACITY};
pub use commands::{
    Availability, CommandDispatcher, CommandError, CommandSender, ConfigurationResult, KeyValue,
    PendingCommand, ResetKind, SharedCommandDispatcher, SharedCommandSender, TriggerType,
    DEFAULT_COMMAND_TIMEOUT,
};
pub use session::{
    AcceptAll, AllowList, InboundAction, ProtocolError, RegistrationPolicy, SessionManager,
    SessionRegistry, SharedSessionManager, SharedSessionRegistry, TransactionIdAllocator,
};
