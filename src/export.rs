// 📤 CSV export of the transaction history (oldest first)

use crate::transaction::Transaction;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: String,
    kind: &'a str,
    amount: f64,
    timestamp: String,
}

impl<'a> From<&'a Transaction> for CsvRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        CsvRow {
            id: tx.id.to_string(),
            kind: tx.kind.as_str(),
            amount: tx.amount,
            timestamp: tx.timestamp.to_rfc3339(),
        }
    }
}

/// Write `history` as CSV to any writer. Returns the number of rows written.
pub fn write_csv<W: Write>(writer: W, history: &[Transaction]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    if history.is_empty() {
        // serialize() only emits headers alongside the first row
        wtr.write_record(["id", "kind", "amount", "timestamp"])?;
    }

    for tx in history {
        wtr.serialize(CsvRow::from(tx))
            .context("Failed to write CSV row")?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(history.len())
}

pub fn export_csv(path: &Path, history: &[Transaction]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(file, history)
}
