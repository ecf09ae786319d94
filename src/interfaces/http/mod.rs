//! HTTP REST API
//!
//! - `common`: response envelope and the validating JSON extractor
//! - `modules`: one folder per resource (dto + handlers)
//! - `router`: route table, OpenAPI document and middleware stack

pub mod common;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiDoc, ApiState};
