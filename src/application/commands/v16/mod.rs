//! OCPP 1.6 command builders: typed request in, typed decoder out

pub mod change_availability;
pub mod change_configuration;
pub mod clear_cache;
pub mod get_configuration;
pub mod get_diagnostics;
pub mod remote_start;
pub mod remote_stop;
pub mod reset;
pub mod trigger_message;
pub mod unlock_connector;
pub mod update_firmware;
