//! Database entities module

pub mod charge_point;
pub mod connector;
pub mod meter_value;
pub mod ocpp_message;
pub mod transaction;

pub use charge_point::Entity as ChargePoint;
pub use connector::Entity as Connector;
pub use meter_value::Entity as MeterValue;
pub use ocpp_message::Entity as OcppMessage;
pub use transaction::Entity as Transaction;
