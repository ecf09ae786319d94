//! Charge point and connector read model

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
