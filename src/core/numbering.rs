// Document-number allocation for invoices, credit memos, ledger transactions
// and estimates.
//
// Display numbers are derived from named atomic sequences owned by the store
// (a counter map in the embedded engine, a row-locked `sequences` table in
// MySQL). The "scan the last record and increment" pattern is deliberately
// absent: the store hands out the next value under its own serialization, so
// two concurrent allocations can never produce the same number.

use chrono::NaiveDate;

/// A named counter the store increments atomically.
///
/// Invoices, credit memos and transactions draw from one global counter per
/// kind. Estimates restart daily, so their counter is keyed by prefix and day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    Invoice,
    CreditMemo,
    Transaction,
    /// Daily counter; `prefix` distinguishes estimate-type from invoice-type
    /// estimates, which number independently.
    Estimate { prefix: String, day: NaiveDate },
}

impl SequenceKind {
    /// Storage key for this counter.
    pub fn key(&self) -> String {
        match self {
            SequenceKind::Invoice => "invoice".to_string(),
            SequenceKind::CreditMemo => "credit_memo".to_string(),
            SequenceKind::Transaction => "transaction".to_string(),
            SequenceKind::Estimate { prefix, day } => {
                format!("estimate:{}:{}", prefix, day.format("%Y%m%d"))
            }
        }
    }
}

/// Format a global sequential number: prefix + zero-padded value.
///
/// `format_number("TXN", 7, 4)` is `"TXN0007"`. Values wider than the pad
/// width are not truncated.
pub fn format_number(prefix: &str, value: u64, width: usize) -> String {
    format!("{}{:0width$}", prefix, value, width = width)
}

/// Format a daily sequential number: prefix, day, zero-padded value.
///
/// `format_daily_number("EST", 2024-03-01, 2, 3)` is `"EST-20240301-002"`.
pub fn format_daily_number(prefix: &str, day: NaiveDate, value: u64, width: usize) -> String {
    format!(
        "{}-{}-{:0width$}",
        prefix,
        day.format("%Y%m%d"),
        value,
        width = width
    )
}
