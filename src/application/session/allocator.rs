//! Process-wide transaction id sequence

use std::sync::atomic::{AtomicI32, Ordering};

use crate::domain::{StateStore, StoreResult};

pub const DEFAULT_TRANSACTION_ID_START: i32 = 1000;

/// Lock-free, strictly increasing transaction ids shared by every
/// connection task.
#[derive(Debug)]
pub struct TransactionIdAllocator {
    last: AtomicI32,
}

impl TransactionIdAllocator {
    /// The first id handed out is `last + 1`.
    pub fn new(last: i32) -> Self {
        Self {
            last: AtomicI32::new(last),
        }
    }

    /// Continue after the highest id already stored, never below `start`.
    pub async fn seeded(store: &dyn StateStore, start: i32) -> StoreResult<Self> {
        let stored = store.max_transaction_id().await?;
        Ok(Self::new(stored.map_or(start, |max| max.max(start))))
    }

    pub fn next_id(&self) -> i32 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Highest id handed out so far (or the seed).
    pub fn last_issued(&self) -> i32 {
        self.last.load(Ordering::SeqCst)
    }
}

impl Default for TransactionIdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSACTION_ID_START)
    }
}
