// ⚠️ Error model for the ledger core
// Validation and funds failures are user-visible and recoverable.
// Persisted-state problems are recovered on load and never fatal.

use thiserror::Error;

/// Outcome of a rejected or failed ledger operation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount was zero, negative, NaN or infinite.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    /// Withdrawal larger than the current balance.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: f64, available: f64 },

    /// The store refused the write. The in-memory state was rolled back.
    #[error("failed to persist ledger state")]
    Persistence(#[source] anyhow::Error),
}

impl LedgerError {
    /// True for errors caused by user input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidAmount(_) | LedgerError::InsufficientFunds { .. }
        )
    }
}

/// Why persisted state was discarded during load.
///
/// Never returned as an `Err` from the ledger: the ledger falls back to
/// an empty account and keeps this around as a warning.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadFailure {
    #[error("stored balance is not a valid amount: {0:?}")]
    MalformedBalance(String),

    #[error("stored history is not valid JSON: {0}")]
    MalformedHistory(String),

    #[error("stored history contains an invalid record at position {0}")]
    InvalidRecord(usize),

    #[error("storage could not be read: {0}")]
    Unreadable(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
