//! Transaction entity

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    InProgress,
    Completed,
    Stopped,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TransactionStatus {
    fn from(s: &str) -> Self {
        match s {
            "Completed" => Self::Completed,
            "Stopped" => Self::Stopped,
            _ => Self::InProgress,
        }
    }
}

/// One charging session on a connector. The id is assigned by the
/// central system when StartTransaction is processed and never reused.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i32,
    pub charge_point_id: String,
    pub connector_id: i32,
    pub id_tag: String,
    pub start_time: DateTime<Utc>,
    pub meter_start: i32,
    pub end_time: Option<DateTime<Utc>>,
    pub meter_stop: Option<i32>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn start(
        id: i32,
        charge_point_id: impl Into<String>,
        connector_id: i32,
        id_tag: impl Into<String>,
        meter_start: i32,
        start_time: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            charge_point_id: charge_point_id.into(),
            connector_id,
            id_tag: id_tag.into(),
            start_time,
            meter_start,
            end_time: None,
            meter_stop: None,
            status: TransactionStatus::InProgress,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Apply a stop event. Returns `false` (and leaves the record untouched)
    /// when the transaction was already completed.
    pub fn complete(&mut self, end_time: DateTime<Utc>, meter_stop: i32) -> bool {
        if self.is_completed() {
            return false;
        }
        self.end_time = Some(end_time);
        self.meter_stop = Some(meter_stop);
        self.status = TransactionStatus::Completed;
        self.updated_at = Utc::now();
        true
    }
}

/// Result of [`StateStore::complete_transaction`](crate::domain::StateStore::complete_transaction).
#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// The transaction moved from InProgress to Completed.
    Completed(Transaction),
    /// A repeated stop; the stored record is returned unchanged.
    AlreadyCompleted(Transaction),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn complete_transitions_exactly_once() {
        let t0 = Utc::now();
        let mut tx = Transaction::start(1001, "CP-1", 1, "TAG1", 100, t0);
        assert_eq!(tx.status, TransactionStatus::InProgress);

        let t1 = t0 + Duration::minutes(30);
        assert!(tx.complete(t1, 250));
        assert_eq!(tx.meter_stop, Some(250));
        assert_eq!(tx.end_time, Some(t1));

        assert!(!tx.complete(t1 + Duration::minutes(1), 999));
        assert_eq!(tx.meter_stop, Some(250));
        assert_eq!(tx.end_time, Some(t1));
    }
}
