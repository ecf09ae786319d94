//! Charge point DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ChargePoint, Connector};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChargePointDto {
    pub id: String,
    pub vendor: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    /// Pending, Accepted or Rejected
    pub registration_status: String,
    /// Persisted connection flag.
    pub is_connected: bool,
    /// Whether this process currently holds a live session for the device.
    pub is_online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargePointDto {
    pub fn from_domain(cp: ChargePoint, is_online: bool) -> Self {
        Self {
            id: cp.id,
            vendor: cp.vendor,
            model: cp.model,
            serial_number: cp.serial_number,
            firmware_version: cp.firmware_version,
            registration_status: cp.registration_status.to_string(),
            is_connected: cp.is_connected,
            is_online,
            connected_since: cp.connected_since,
            last_heartbeat: cp.last_heartbeat,
            created_at: cp.created_at,
            updated_at: cp.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorDto {
    pub connector_id: i32,
    pub status: String,
    pub error_code: String,
    pub updated_at: DateTime<Utc>,
}

impl From<Connector> for ConnectorDto {
    fn from(connector: Connector) -> Self {
        Self {
            connector_id: connector.connector_id,
            status: connector.status.to_string(),
            error_code: connector.error_code,
            updated_at: connector.updated_at,
        }
    }
}
