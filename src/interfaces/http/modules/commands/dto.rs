//! Command DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::{Availability, ConfigurationResult, KeyValue, ResetKind};

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub enum ResetType {
    Hard,
    Soft,
}

impl From<ResetType> for ResetKind {
    fn from(value: ResetType) -> Self {
        match value {
            ResetType::Hard => ResetKind::Hard,
            ResetType::Soft => ResetKind::Soft,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub enum AvailabilityType {
    Operative,
    Inoperative,
}

impl From<AvailabilityType> for Availability {
    fn from(value: AvailabilityType) -> Self {
        match value {
            AvailabilityType::Operative => Availability::Operative,
            AvailabilityType::Inoperative => Availability::Inoperative,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetRequest {
    #[serde(rename = "type")]
    pub reset_type: ResetType,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAvailabilityRequest {
    /// 0 addresses the whole charge point.
    pub connector_id: u32,
    #[serde(rename = "type")]
    pub availability_type: AvailabilityType,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnlockConnectorRequest {
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub connector_id: u32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStartRequest {
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub connector_id: u32,
    #[validate(length(min = 1, max = 20, message = "must be 1-20 characters"))]
    pub id_tag: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStopRequest {
    #[validate(range(min = 1, message = "must be positive"))]
    pub transaction_id: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetDiagnosticsRequest {
    /// Upload target, e.g. `ftp://logs.example.com/`.
    #[validate(url(message = "must be a URL"))]
    pub location: String,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFirmwareRequest {
    #[validate(url(message = "must be a URL"))]
    pub location: String,
    pub retrieve_date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetConfigurationRequest {
    /// Omit to read every key.
    pub keys: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeConfigurationRequest {
    #[validate(length(min = 1, max = 50, message = "must be 1-50 characters"))]
    pub key: String,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommandResponse {
    /// Status reported by the charge point, e.g. `Accepted`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn from_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    /// Name of the file the charge point will upload, if any.
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigValue {
    pub key: String,
    pub readonly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<KeyValue> for ConfigValue {
    fn from(kv: KeyValue) -> Self {
        Self {
            key: kv.key,
            readonly: kv.readonly,
            value: kv.value,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationResponse {
    pub configuration_key: Vec<ConfigValue>,
    pub unknown_key: Vec<String>,
}

impl From<ConfigurationResult> for ConfigurationResponse {
    fn from(result: ConfigurationResult) -> Self {
        Self {
            configuration_key: result
                .configuration_key
                .into_iter()
                .map(ConfigValue::from)
                .collect(),
            unknown_key: result.unknown_key,
        }
    }
}
