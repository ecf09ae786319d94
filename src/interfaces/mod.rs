//! Outer surfaces: the OCPP WebSocket endpoint and the REST façade.

pub mod http;
pub mod ws;
