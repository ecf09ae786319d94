//! Closed set of charge point → central system actions

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundAction {
    Authorize,
    BootNotification,
    DataTransfer,
    DiagnosticsStatusNotification,
    FirmwareStatusNotification,
    Heartbeat,
    MeterValues,
    StartTransaction,
    StatusNotification,
    StopTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported action: {0}")]
pub struct UnknownAction(pub String);

impl InboundAction {
    pub const ALL: [InboundAction; 10] = [
        Self::Authorize,
        Self::BootNotification,
        Self::DataTransfer,
        Self::DiagnosticsStatusNotification,
        Self::FirmwareStatusNotification,
        Self::Heartbeat,
        Self::MeterValues,
        Self::StartTransaction,
        Self::StatusNotification,
        Self::StopTransaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorize => "Authorize",
            Self::BootNotification => "BootNotification",
            Self::DataTransfer => "DataTransfer",
            Self::DiagnosticsStatusNotification => "DiagnosticsStatusNotification",
            Self::FirmwareStatusNotification => "FirmwareStatusNotification",
            Self::Heartbeat => "Heartbeat",
            Self::MeterValues => "MeterValues",
            Self::StartTransaction => "StartTransaction",
            Self::StatusNotification => "StatusNotification",
            Self::StopTransaction => "StopTransaction",
        }
    }
}

impl fmt::Display for InboundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InboundAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_round_trips_through_its_name() {
        for action in InboundAction::ALL {
            assert_eq!(action.as_str().parse::<InboundAction>(), Ok(action));
        }
    }

    #[test]
    fn central_system_actions_are_rejected() {
        assert_eq!(
            "RemoteStartTransaction".parse::<InboundAction>(),
            Err(UnknownAction("RemoteStartTransaction".into()))
        );
        assert!("heartbeat".parse::<InboundAction>().is_err());
    }
}
