//! WebSocket interfaces
//!
//! - `ocpp_server`: OCPP 1.6 WebSocket server (handshake, per-connection tasks)
//! - `frame_handler`: OCPP-J frame routing for one connection

pub mod frame_handler;
pub mod ocpp_server;

pub use frame_handler::FrameHandler;
pub use ocpp_server::{extract_charge_point_id, OcppServer};
