//! BootNotification registration decisions

use std::collections::HashSet;

use crate::domain::RegistrationStatus;

/// Identity fields a device reports in BootNotification.
#[derive(Debug, Clone, Copy)]
pub struct BootInfo<'a> {
    pub charge_point_id: &'a str,
    pub vendor: &'a str,
    pub model: &'a str,
    pub serial_number: Option<&'a str>,
    pub firmware_version: Option<&'a str>,
}

pub trait RegistrationPolicy: Send + Sync {
    fn decide(&self, boot: &BootInfo<'_>) -> RegistrationStatus;
}

/// Accepts every device.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl RegistrationPolicy for AcceptAll {
    fn decide(&self, _boot: &BootInfo<'_>) -> RegistrationStatus {
        RegistrationStatus::Accepted
    }
}

/// Accepts only the listed charge point ids; everyone else is rejected.
#[derive(Debug, Default, Clone)]
pub struct AllowList {
    allowed: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl RegistrationPolicy for AllowList {
    fn decide(&self, boot: &BootInfo<'_>) -> RegistrationStatus {
        if self.allowed.contains(boot.charge_point_id) {
            RegistrationStatus::Accepted
        } else {
            RegistrationStatus::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boot(id: &str) -> BootInfo<'_> {
        BootInfo {
            charge_point_id: id,
            vendor: "Acme",
            model: "X1",
            serial_number: None,
            firmware_version: None,
        }
    }

    #[test]
    fn allow_list_rejects_unlisted_ids() {
        let policy = AllowList::new(["CP-1"]);
        assert_eq!(policy.decide(&boot("CP-1")), RegistrationStatus::Accepted);
        assert_eq!(policy.decide(&boot("CP-9")), RegistrationStatus::Rejected);
        assert_eq!(AcceptAll.decide(&boot("CP-9")), RegistrationStatus::Accepted);
    }
}
