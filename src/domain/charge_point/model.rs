//! Charge point and connector entities

use chrono::{DateTime, Utc};

/// Vendor/model placeholder for devices that connected but never booted.
pub const UNKNOWN_IDENTITY: &str = "Unknown";

/// Outcome of a BootNotification, persisted as `registration_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RegistrationStatus {
    fn from(s: &str) -> Self {
        match s {
            "Accepted" => Self::Accepted,
            "Rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// Charge point record. Root of every other persisted entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargePoint {
    pub id: String,
    pub vendor: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub registration_status: RegistrationStatus,
    pub is_connected: bool,
    /// Only advances on a disconnected → connected transition.
    pub connected_since: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargePoint {
    /// Minimal record for a device seen on the wire before any BootNotification.
    pub fn unregistered(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            vendor: UNKNOWN_IDENTITY.to_string(),
            model: UNKNOWN_IDENTITY.to_string(),
            serial_number: None,
            firmware_version: None,
            registration_status: RegistrationStatus::Pending,
            is_connected: true,
            connected_since: Some(now),
            last_heartbeat: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold `incoming` into the stored record, applying the
    /// `connected_since` monotonicity rule.
    pub fn merged_with(&self, incoming: ChargePoint) -> ChargePoint {
        let connected_since = if !self.is_connected && incoming.is_connected {
            incoming.connected_since
        } else {
            self.connected_since
        };
        ChargePoint {
            connected_since,
            created_at: self.created_at,
            ..incoming
        }
    }

    /// Flip the connection flag, stamping `connected_since` only when the
    /// device was previously disconnected.
    pub fn set_connected(&mut self, connected: bool, at: DateTime<Utc>) {
        if connected && !self.is_connected {
            self.connected_since = Some(at);
        }
        self.is_connected = connected;
        self.updated_at = at;
    }
}

/// Operational state reported by StatusNotification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectorStatus {
    #[default]
    Available,
    Preparing,
    Charging,
    SuspendedEVSE,
    SuspendedEV,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Preparing => "Preparing",
            Self::Charging => "Charging",
            Self::SuspendedEVSE => "SuspendedEVSE",
            Self::SuspendedEV => "SuspendedEV",
            Self::Finishing => "Finishing",
            Self::Reserved => "Reserved",
            Self::Unavailable => "Unavailable",
            Self::Faulted => "Faulted",
        }
    }
}

impl std::fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ConnectorStatus {
    fn from(s: &str) -> Self {
        match s {
            "Available" => Self::Available,
            "Preparing" => Self::Preparing,
            "Charging" => Self::Charging,
            "SuspendedEVSE" => Self::SuspendedEVSE,
            "SuspendedEV" => Self::SuspendedEV,
            "Finishing" => Self::Finishing,
            "Reserved" => Self::Reserved,
            "Faulted" => Self::Faulted,
            _ => Self::Unavailable,
        }
    }
}

/// Latest reported state of one connector, keyed by
/// (`charge_point_id`, `connector_id`).
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub charge_point_id: String,
    pub connector_id: i32,
    pub status: ConnectorStatus,
    pub error_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connector {
    pub fn new(
        charge_point_id: impl Into<String>,
        connector_id: i32,
        status: ConnectorStatus,
        error_code: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            charge_point_id: charge_point_id.into(),
            connector_id,
            status,
            error_code: error_code.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn merge_keeps_connected_since_while_connected() {
        let t0 = Utc::now();
        let stored = ChargePoint::unregistered("CP-1", t0);

        let mut boot = ChargePoint::unregistered("CP-1", t0 + Duration::seconds(30));
        boot.vendor = "Acme".into();
        boot.registration_status = RegistrationStatus::Accepted;

        let merged = stored.merged_with(boot);
        assert_eq!(merged.vendor, "Acme");
        assert_eq!(merged.registration_status, RegistrationStatus::Accepted);
        assert_eq!(merged.connected_since, Some(t0));
        assert_eq!(merged.created_at, t0);
    }

    #[test]
    fn merge_advances_connected_since_after_disconnect() {
        let t0 = Utc::now();
        let mut stored = ChargePoint::unregistered("CP-1", t0);
        stored.set_connected(false, t0 + Duration::seconds(5));

        let t1 = t0 + Duration::seconds(60);
        let merged = stored.merged_with(ChargePoint::unregistered("CP-1", t1));
        assert_eq!(merged.connected_since, Some(t1));
    }

    #[test]
    fn set_connected_twice_keeps_first_timestamp() {
        let t0 = Utc::now();
        let mut cp = ChargePoint::unregistered("CP-1", t0);
        cp.set_connected(true, t0 + Duration::seconds(10));
        assert_eq!(cp.connected_since, Some(t0));

        cp.set_connected(false, t0 + Duration::seconds(20));
        assert_eq!(cp.connected_since, Some(t0));
        assert!(!cp.is_connected);
    }

    #[test]
    fn connector_status_parses_wire_names() {
        assert_eq!(ConnectorStatus::from("SuspendedEVSE"), ConnectorStatus::SuspendedEVSE);
        assert_eq!(ConnectorStatus::from("bogus"), ConnectorStatus::Unavailable);
        assert_eq!(ConnectorStatus::Charging.to_string(), "Charging");
    }
}
