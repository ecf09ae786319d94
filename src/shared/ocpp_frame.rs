//! OCPP-J message framing
//!
//! JSON-over-WebSocket envelope used by OCPP 1.6:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`

use serde_json::{json, Value};
use thiserror::Error;

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

/// OCPP-J error codes used when the central system answers a Call with a CallError.
pub mod error_code {
    pub const NOT_IMPLEMENTED: &str = "NotImplemented";
    pub const FORMATION_VIOLATION: &str = "FormationViolation";
    pub const PROPERTY_CONSTRAINT_VIOLATION: &str = "PropertyConstraintViolation";
    pub const INTERNAL_ERROR: &str = "InternalError";
}

/// A parsed OCPP-J frame.
#[derive(Debug, Clone, PartialEq)]
pub enum OcppFrame {
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    CallResult {
        unique_id: String,
        payload: Value,
    },
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

/// Errors produced while decoding a raw text frame.
#[derive(Debug, Error)]
pub enum OcppFrameError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Frame is not a JSON array")]
    NotAnArray,
    #[error("Message type is missing or not a number")]
    InvalidMessageType,
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),
    #[error("Expected at least {expected} fields, got {got}")]
    MissingFields { expected: usize, got: usize },
    #[error("Field type mismatch: {0}")]
    FieldTypeMismatch(&'static str),
}

impl OcppFrame {
    pub fn parse(text: &str) -> Result<Self, OcppFrameError> {
        let value: Value = serde_json::from_str(text)?;
        let arr = value.as_array().ok_or(OcppFrameError::NotAnArray)?;

        let msg_type = arr
            .first()
            .and_then(Value::as_u64)
            .ok_or(OcppFrameError::InvalidMessageType)?;

        match msg_type {
            MSG_TYPE_CALL => {
                require_len(arr, 4)?;
                Ok(Self::Call {
                    unique_id: string_at(arr, 1, "uniqueId must be a string")?,
                    action: string_at(arr, 2, "action must be a string")?,
                    payload: arr[3].clone(),
                })
            }
            MSG_TYPE_CALL_RESULT => {
                require_len(arr, 3)?;
                let payload = match &arr[2] {
                    Value::Null => json!({}),
                    other => other.clone(),
                };
                Ok(Self::CallResult {
                    unique_id: string_at(arr, 1, "uniqueId must be a string")?,
                    payload,
                })
            }
            MSG_TYPE_CALL_ERROR => {
                require_len(arr, 3)?;
                Ok(Self::CallError {
                    unique_id: string_at(arr, 1, "uniqueId must be a string")?,
                    error_code: arr[2]
                        .as_str()
                        .unwrap_or(error_code::INTERNAL_ERROR)
                        .to_string(),
                    error_description: arr
                        .get(3)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    error_details: arr.get(4).cloned().unwrap_or_else(|| json!({})),
                })
            }
            other => Err(OcppFrameError::UnknownMessageType(other)),
        }
    }

    pub fn serialize(&self) -> String {
        let arr = match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => json!([MSG_TYPE_CALL, unique_id, action, payload]),
            Self::CallResult { unique_id, payload } => {
                json!([MSG_TYPE_CALL_RESULT, unique_id, payload])
            }
            Self::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => json!([
                MSG_TYPE_CALL_ERROR,
                unique_id,
                error_code,
                error_description,
                error_details
            ]),
        };
        arr.to_string()
    }

    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call { unique_id, .. }
            | Self::CallResult { unique_id, .. }
            | Self::CallError { unique_id, .. } => unique_id,
        }
    }

    /// Build a `CallError` answering the Call with the given unique id.
    pub fn error_response(
        unique_id: impl Into<String>,
        error_code: impl Into<String>,
        error_description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            unique_id: unique_id.into(),
            error_code: error_code.into(),
            error_description: error_description.into(),
            error_details: json!({}),
        }
    }
}

fn require_len(arr: &[Value], expected: usize) -> Result<(), OcppFrameError> {
    if arr.len() < expected {
        return Err(OcppFrameError::MissingFields {
            expected,
            got: arr.len(),
        });
    }
    Ok(())
}

fn string_at(arr: &[Value], idx: usize, msg: &'static str) -> Result<String, OcppFrameError> {
    arr[idx]
        .as_str()
        .map(str::to_string)
        .ok_or(OcppFrameError::FieldTypeMismatch(msg))
}
