pub mod ledger_transaction;

pub use ledger_transaction::{LedgerTransaction, TransactionKind};
