//! Order-to-cash ledger engine for dealer billing.
//!
//! This library maintains invoice balances under partial payments, applies
//! multi-invoice payments atomically, runs the one-shot credit-memo
//! lifecycle, keeps a correctable transaction ledger, and aggregates orders
//! into estimates. Every financial mutation executes inside a single store
//! transaction; nothing is visible until it commits.

pub mod config;
pub mod core;
pub mod modules;
pub mod store;

// Re-export commonly used types
pub use crate::core::{ErrorKind, LedgerError, Result};
pub use modules::credit_memos;
pub use modules::estimates;
pub use modules::invoices;
pub use modules::payments;
pub use modules::transactions;
