//! Infrastructure layer: persistence backends for the state store

pub mod database;
pub mod storage;

pub use database::{init_database, DatabaseConfig, SeaOrmStateStore};
pub use storage::{DeadlineStore, InMemoryStore};
