//! State store implementations that do not need a database

mod deadline;
mod memory;
#[cfg(test)]
pub(crate) mod scripted;

pub use deadline::{DeadlineStore, DEFAULT_STORE_TIMEOUT};
pub use memory::InMemoryStore;
