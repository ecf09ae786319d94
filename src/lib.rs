//! # OCPP Central System
//!
//! Session and state engine for OCPP 1.6 charge points.
//!
//! ## Architecture
//!
//! - **domain**: persisted entities and the [`StateStore`](domain::StateStore) contract
//! - **application**: inbound action handling, outbound commands, audit trail
//! - **infrastructure**: SeaORM and in-memory state stores, migrations
//! - **interfaces**: OCPP WebSocket server and REST API with Swagger documentation
//! - **shared**: OCPP-J framing and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmStateStore};
pub use interfaces::http::create_api_router;
