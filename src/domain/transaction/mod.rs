pub mod model;

pub use model::{StopOutcome, Transaction, TransactionStatus};
