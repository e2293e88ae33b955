// ATM Simulator - Core Library
// Exposes the ledger core to the terminal UI, the CLI, the API server and tests

pub mod config;
pub mod error;
pub mod export;
pub mod ledger;
pub mod logging;
pub mod persistence;
pub mod presentation;
pub mod store;
pub mod transaction;

// Only compile the terminal UI when the TUI feature is enabled
#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use config::Config;
pub use error::{LedgerError, LedgerResult, LoadFailure};
pub use export::{export_csv, write_csv};
pub use ledger::{Ledger, ResetOutcome};
pub use persistence::{LoadedState, Persistence, BALANCE_KEY, HISTORY_KEY};
pub use presentation::{
    balance_message, format_currency, format_timestamp, history_rows, outcome_message,
    parse_amount, Action, HistoryRow, StatusKind, StatusMessage, Teller,
};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use transaction::{Transaction, TransactionKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
