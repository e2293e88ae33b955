// 🏧 Account Ledger - balance + chronological history for one local account
//
// Every operation is validate -> mutate -> save. If the save fails the
// mutation is undone, so callers never observe a half-applied operation.

use crate::error::{LedgerError, LedgerResult, LoadFailure};
use crate::persistence::Persistence;
use crate::store::KeyValueStore;
use crate::transaction::Transaction;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Balance zeroed and history cleared
    Reset,
    /// Confirmation was refused; nothing changed
    Cancelled,
}

pub struct Ledger<S: KeyValueStore> {
    balance: f64,
    history: Vec<Transaction>,
    persistence: Persistence<S>,
    load_failure: Option<LoadFailure>,
}

impl<S: KeyValueStore> Ledger<S> {
    /// Load the ledger from `store`, falling back to an empty account when
    /// stored data is missing or unusable.
    pub fn open(store: S) -> Self {
        let persistence = Persistence::new(store);
        let loaded = persistence.load();

        info!(
            balance = loaded.balance,
            transactions = loaded.history.len(),
            recovered = loaded.failure.is_some(),
            "ledger loaded"
        );

        Ledger {
            balance: loaded.balance,
            history: loaded.history,
            persistence,
            load_failure: loaded.failure,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Oldest first
    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    /// Why stored state was discarded at open, if it was
    pub fn load_failure(&self) -> Option<&LoadFailure> {
        self.load_failure.as_ref()
    }

    /// Hand the load warning to the presentation once
    pub fn take_load_failure(&mut self) -> Option<LoadFailure> {
        self.load_failure.take()
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.persistence.store_mut()
    }

    pub fn deposit(&mut self, amount: f64) -> LedgerResult<Transaction> {
        validate_amount(amount)?;
        if !(self.balance + amount).is_finite() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.commit(Transaction::deposit(amount))
    }

    pub fn withdraw(&mut self, amount: f64) -> LedgerResult<Transaction> {
        validate_amount(amount)?;

        if amount > self.balance {
            debug!(amount, balance = self.balance, "withdrawal rejected");
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }

        self.commit(Transaction::withdrawal(amount))
    }

    /// Zero the balance and clear the history once `confirm` agrees.
    pub fn reset<F>(&mut self, confirm: F) -> LedgerResult<ResetOutcome>
    where
        F: FnOnce() -> bool,
    {
        if !confirm() {
            debug!("reset cancelled");
            return Ok(ResetOutcome::Cancelled);
        }

        let previous_balance = self.balance;
        let previous_history = std::mem::take(&mut self.history);
        self.balance = 0.0;

        if let Err(e) = self.persistence.save(self.balance, &self.history) {
            self.balance = previous_balance;
            self.history = previous_history;
            return Err(LedgerError::Persistence(e));
        }

        info!(discarded = previous_history.len(), "ledger reset");
        Ok(ResetOutcome::Reset)
    }

    fn commit(&mut self, tx: Transaction) -> LedgerResult<Transaction> {
        let previous_balance = self.balance;
        self.balance += tx.signed_amount();
        self.history.push(tx.clone());

        if let Err(e) = self.persistence.save(self.balance, &self.history) {
            self.history.pop();
            self.balance = previous_balance;
            return Err(LedgerError::Persistence(e));
        }

        info!(
            kind = tx.kind.as_str(),
            amount = tx.amount,
            balance = self.balance,
            "transaction committed"
        );
        Ok(tx)
    }
}

fn validate_amount(amount: f64) -> LedgerResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        debug!(amount, "amount rejected");
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}
