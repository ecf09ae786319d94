//! Persisted entities and the state store contract.

pub mod charge_point;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod transaction;

pub use charge_point::{ChargePoint, Connector, ConnectorStatus, RegistrationStatus};
pub use error::{StoreError, StoreResult};
pub use store::{SharedStateStore, StateStore};
pub use telemetry::{
    Direction, MessageKind, MeterValue, OcppMessage, DEFAULT_MEASURAND, DEFAULT_UNIT,
};
pub use transaction::{StopOutcome, Transaction, TransactionStatus};
