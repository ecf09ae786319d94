//! Per-connection OCPP-J frame routing

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::application::{SharedCommandSender, SharedSessionManager};
use crate::shared::ocpp_frame::OcppFrame;

/// Routes the text frames of one connection.
///
/// Calls from the charge point go to the [`SessionManager`](crate::application::SessionManager);
/// CallResult/CallError frames answer commands we sent and go to the
/// [`CommandSender`](crate::application::CommandSender).
pub struct FrameHandler {
    charge_point_id: String,
    session_manager: SharedSessionManager,
    command_sender: SharedCommandSender,
}

impl FrameHandler {
    pub fn new(
        charge_point_id: impl Into<String>,
        session_manager: SharedSessionManager,
        command_sender: SharedCommandSender,
    ) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            session_manager,
            command_sender,
        }
    }

    pub fn charge_point_id(&self) -> &str {
        &self.charge_point_id
    }

    /// Handle one text frame. Returns the reply frame, if any.
    pub async fn handle(&self, text: &str) -> Option<String> {
        let frame = match OcppFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                error!(
                    charge_point_id = self.charge_point_id.as_str(),
                    error = %e,
                    raw = text,
                    "Failed to parse OCPP frame, dropping"
                );
                return None;
            }
        };

        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => Some(self.handle_call(unique_id, action, payload).await),
            OcppFrame::CallResult { unique_id, payload } => {
                self.command_sender
                    .handle_response(&self.charge_point_id, &unique_id, payload);
                None
            }
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                self.command_sender.handle_error(
                    &self.charge_point_id,
                    &unique_id,
                    &error_code,
                    &error_description,
                );
                None
            }
        }
    }

    async fn handle_call(&self, unique_id: String, action: String, payload: Value) -> String {
        debug!(
            charge_point_id = self.charge_point_id.as_str(),
            action = action.as_str(),
            unique_id = unique_id.as_str(),
            "Received Call"
        );

        let reply = match self
            .session_manager
            .handle(&self.charge_point_id, &unique_id, &action, payload)
            .await
        {
            Ok(confirmation) => OcppFrame::CallResult {
                unique_id,
                payload: confirmation,
            },
            Err(e) => {
                warn!(
                    charge_point_id = self.charge_point_id.as_str(),
                    action = action.as_str(),
                    error_code = e.error_code(),
                    "Answering Call with CallError"
                );
                OcppFrame::error_response(unique_id, e.error_code(), e.to_string())
            }
        };
        reply.serialize()
    }
}
