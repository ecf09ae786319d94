use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by a [`StateStore`](super::StateStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Store call exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl StoreError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
