pub mod model;

pub use model::{ChargePoint, Connector, ConnectorStatus, RegistrationStatus, UNKNOWN_IDENTITY};
