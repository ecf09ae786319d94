//! Append-only records: meter samples and the protocol audit trail

use chrono::{DateTime, Utc};

pub const DEFAULT_MEASURAND: &str = "Energy.Active.Import.Register";
pub const DEFAULT_UNIT: &str = "Wh";

/// One sampled value from a MeterValues or StopTransaction batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterValue {
    pub transaction_id: Option<i32>,
    pub charge_point_id: String,
    /// `0` when the reporting path does not carry a connector.
    pub connector_id: i32,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    pub measurand: String,
}

impl MeterValue {
    /// Numeric value of a sampled value string; unparsable input reads as `0.0`.
    pub fn parse_value(raw: &str) -> f64 {
        raw.trim().parse::<f64>().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "Request",
            Self::Response => "Response",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Charge point → central system
    Inbound,
    /// Central system → charge point
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "Inbound",
            Self::Outbound => "Outbound",
        }
    }
}

/// Audit entry for one protocol message. Written once, never read back by
/// the session engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OcppMessage {
    pub charge_point_id: String,
    pub kind: MessageKind,
    pub action: String,
    pub request_id: String,
    /// Raw JSON text of the payload.
    pub payload: String,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}
