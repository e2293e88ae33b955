// 🖥️ Presentation helpers shared by the terminal UI, the CLI and the server
// Parsing user input, currency/time formatting, status messages, and the
// Teller session that drives a Ledger from text input.

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Ledger, ResetOutcome};
use crate::store::KeyValueStore;
use crate::transaction::{Transaction, TransactionKind};
use chrono::{DateTime, Local, Utc};
use std::time::{Duration, Instant};

pub const DEFAULT_STATUS_TTL: Duration = Duration::from_millis(3500);
pub const EMPTY_HISTORY_TEXT: &str = "No transactions yet.";

// ============================================================================
// INPUT PARSING
// ============================================================================

/// Turn raw field text into an amount.
///
/// Accepts a comma as decimal separator and ignores trailing garbage
/// ("12,5 reais" -> 12.5). Text without a leading number becomes 0, which
/// the ledger then rejects as an invalid amount.
pub fn parse_amount(text: &str) -> f64 {
    let normalized = text.replacen(',', ".", 1);
    let prefix = number_prefix(normalized.trim_start());

    match prefix.parse::<f64>() {
        Ok(value) if !value.is_nan() => value,
        _ => 0.0,
    }
}

/// Longest leading slice that reads as a decimal number
fn number_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    if s[end..].starts_with("Infinity") {
        return &s[..end + "Infinity".len()];
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    &s[..end]
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

// ============================================================================
// FORMATTING
// ============================================================================

/// Brazilian real, e.g. `R$ 1.234,56`
pub fn format_currency(value: f64) -> String {
    // Fixed-point text, no integer cast: balances can exceed u64 cents
    let fixed = format!("{:.2}", value.abs());
    let (units, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let rounds_to_zero = fixed.bytes().all(|b| b == b'0' || b == b'.');
    let sign = if value < 0.0 && !rounds_to_zero { "-" } else { "" };
    format!("{sign}R$ {grouped},{fraction}")
}

/// Local wall-clock time, e.g. `31/12/2024, 18:05:09`
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%d/%m/%Y, %H:%M:%S")
        .to_string()
}

/// One rendered line of the history list
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub kind: TransactionKind,
    pub amount: String,
    pub when: String,
}

impl HistoryRow {
    pub fn from_transaction(tx: &Transaction) -> Self {
        HistoryRow {
            kind: tx.kind,
            amount: format_currency(tx.amount),
            when: format_timestamp(&tx.timestamp),
        }
    }

    pub fn to_line(&self) -> String {
        format!("{} — {} ({})", self.kind, self.amount, self.when)
    }
}

/// Newest first, the way the history is shown to the user
pub fn history_rows(history: &[Transaction]) -> Vec<HistoryRow> {
    history.iter().rev().map(HistoryRow::from_transaction).collect()
}

// ============================================================================
// STATUS MESSAGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    pub expires_at: Instant,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, kind: StatusKind, ttl: Duration) -> Self {
        StatusMessage {
            text: text.into(),
            kind,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Deposit,
    Withdraw,
}

/// User-facing text for the outcome of a deposit or withdrawal
pub fn outcome_message(action: Action, result: &LedgerResult<Transaction>) -> (String, StatusKind) {
    match (action, result) {
        (Action::Deposit, Ok(_)) => ("Deposit completed successfully.".to_string(), StatusKind::Info),
        (Action::Withdraw, Ok(_)) => (
            "Withdrawal completed successfully.".to_string(),
            StatusKind::Info,
        ),
        (Action::Deposit, Err(LedgerError::InvalidAmount(_))) => (
            "Enter a positive amount to deposit.".to_string(),
            StatusKind::Error,
        ),
        (Action::Withdraw, Err(LedgerError::InvalidAmount(_))) => (
            "Enter a positive amount to withdraw.".to_string(),
            StatusKind::Error,
        ),
        (_, Err(LedgerError::InsufficientFunds { .. })) => (
            "Insufficient balance for this withdrawal.".to_string(),
            StatusKind::Error,
        ),
        (_, Err(LedgerError::Persistence(_))) => (
            "Could not save the account. Try again.".to_string(),
            StatusKind::Error,
        ),
    }
}

pub fn balance_message(balance: f64) -> String {
    format!("Your balance is {}.", format_currency(balance))
}

// ============================================================================
// TELLER - a Ledger plus the transient status line
// ============================================================================

pub struct Teller<S: KeyValueStore> {
    ledger: Ledger<S>,
    status: Option<StatusMessage>,
    status_ttl: Duration,
}

impl<S: KeyValueStore> Teller<S> {
    pub fn new(mut ledger: Ledger<S>, status_ttl: Duration) -> Self {
        let status = ledger.take_load_failure().map(|failure| {
            StatusMessage::new(
                format!("Saved data was unreadable and has been reset ({failure})."),
                StatusKind::Error,
                status_ttl,
            )
        });

        Teller {
            ledger,
            status,
            status_ttl,
        }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// Parse `input` then run the action. Returns true when the input field
    /// should be cleared (only on success).
    pub fn submit(&mut self, action: Action, input: &str) -> bool {
        let amount = parse_amount(input);
        let result = match action {
            Action::Deposit => self.ledger.deposit(amount),
            Action::Withdraw => self.ledger.withdraw(amount),
        };

        if let Err(LedgerError::Persistence(e)) = &result {
            tracing::error!(error = %format!("{e:#}"), "save failed");
        }

        let (text, kind) = outcome_message(action, &result);
        self.show(text, kind);
        result.is_ok()
    }

    pub fn query_balance(&mut self) -> f64 {
        let balance = self.ledger.balance();
        self.show(balance_message(balance), StatusKind::Info);
        balance
    }

    /// `confirmed` is the user's answer to "really reset?"
    pub fn reset(&mut self, confirmed: bool) -> LedgerResult<ResetOutcome> {
        let result = self.ledger.reset(|| confirmed);
        match &result {
            Ok(ResetOutcome::Reset) => self.show("Account reset.", StatusKind::Info),
            Ok(ResetOutcome::Cancelled) => {}
            Err(e) => {
                tracing::error!(error = %e, "reset failed");
                self.show("Could not reset the account. Try again.", StatusKind::Error);
            }
        }
        result
    }

    pub fn history_rows(&self) -> Vec<HistoryRow> {
        history_rows(self.ledger.history())
    }

    /// Current status line, if it hasn't expired yet
    pub fn status(&self, now: Instant) -> Option<&StatusMessage> {
        self.status.as_ref().filter(|s| s.is_visible(now))
    }

    /// Latest status line whether or not its TTL has run out. One-shot
    /// commands print this; the TTL only matters to a live screen.
    pub fn last_status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn clear_expired_status(&mut self, now: Instant) {
        if self.status.as_ref().is_some_and(|s| !s.is_visible(now)) {
            self.status = None;
        }
    }

    fn show(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage::new(text, kind, self.status_ttl));
    }
}
