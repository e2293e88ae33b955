// 💾 Persistence Adapter - (balance, history) <-> key-value store
//
// Layout:
//   atm_balance  -> decimal text, e.g. "60" or "12.5"
//   atm_history  -> JSON array of transactions, oldest first
//
// Loading never fails hard: missing keys mean a fresh account, malformed
// data resets BOTH fields and reports a LoadFailure.

use crate::error::LoadFailure;
use crate::store::KeyValueStore;
use crate::transaction::Transaction;
use anyhow::{Context, Result};
use tracing::warn;

pub const BALANCE_KEY: &str = "atm_balance";
pub const HISTORY_KEY: &str = "atm_history";

/// State read back from storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedState {
    pub balance: f64,
    pub history: Vec<Transaction>,
    /// Set when stored data was discarded in favour of defaults
    pub failure: Option<LoadFailure>,
}

pub struct Persistence<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Persistence { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn load(&self) -> LoadedState {
        match self.try_load() {
            Ok((balance, history)) => LoadedState {
                balance,
                history,
                failure: None,
            },
            Err(failure) => {
                warn!(%failure, "discarding stored ledger state");
                LoadedState {
                    failure: Some(failure),
                    ..LoadedState::default()
                }
            }
        }
    }

    fn try_load(&self) -> Result<(f64, Vec<Transaction>), LoadFailure> {
        let raw_balance = self
            .store
            .get(BALANCE_KEY)
            .map_err(|e| LoadFailure::Unreadable(format!("{e:#}")))?;
        let raw_history = self
            .store
            .get(HISTORY_KEY)
            .map_err(|e| LoadFailure::Unreadable(format!("{e:#}")))?;

        let balance = match raw_balance {
            Some(text) => parse_balance(&text)?,
            None => 0.0,
        };

        let history = match raw_history {
            Some(text) => parse_history(&text)?,
            None => Vec::new(),
        };

        Ok((balance, history))
    }

    /// Overwrite both keys with the given state
    pub fn save(&mut self, balance: f64, history: &[Transaction]) -> Result<()> {
        let history_json =
            serde_json::to_string(history).context("Failed to serialize history")?;

        self.store
            .set_many(&[
                (BALANCE_KEY, balance.to_string()),
                (HISTORY_KEY, history_json),
            ])
            .context("Failed to save ledger state")?;

        Ok(())
    }
}

fn parse_balance(text: &str) -> Result<f64, LoadFailure> {
    let trimmed = text.trim();
    // An empty string was never written by save(); treat it like a missing key.
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(LoadFailure::MalformedBalance(text.to_string())),
    }
}

fn parse_history(text: &str) -> Result<Vec<Transaction>, LoadFailure> {
    let history: Vec<Transaction> =
        serde_json::from_str(text).map_err(|e| LoadFailure::MalformedHistory(e.to_string()))?;

    if let Some(position) = history.iter().position(|tx| !tx.is_well_formed()) {
        return Err(LoadFailure::InvalidRecord(position));
    }

    Ok(history)
}
