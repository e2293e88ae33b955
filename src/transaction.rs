// 🧾 Transaction - one recorded deposit or withdrawal
// Immutable once created. Insertion order in the history is chronological order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdrawal => "Withdrawal",
        }
    }

    /// Effect on the balance: +1 for deposits, -1 for withdrawals
    pub fn sign(&self) -> f64 {
        match self {
            TransactionKind::Deposit => 1.0,
            TransactionKind::Withdrawal => -1.0,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identity. Records written before ids existed get a fresh one on load.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub kind: TransactionKind,

    /// Always positive; the kind carries the direction
    pub amount: f64,

    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(kind: TransactionKind, amount: f64, timestamp: DateTime<Utc>) -> Self {
        Transaction {
            id: Uuid::new_v4(),
            kind,
            amount,
            timestamp,
        }
    }

    pub fn deposit(amount: f64) -> Self {
        Self::new(TransactionKind::Deposit, amount, Utc::now())
    }

    pub fn withdrawal(amount: f64) -> Self {
        Self::new(TransactionKind::Withdrawal, amount, Utc::now())
    }

    /// Signed effect on the balance
    pub fn signed_amount(&self) -> f64 {
        self.kind.sign() * self.amount
    }

    /// A record is usable only with a finite, strictly positive amount
    pub fn is_well_formed(&self) -> bool {
        self.amount.is_finite() && self.amount > 0.0
    }
}
