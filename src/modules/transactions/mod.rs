pub mod models;
pub mod services;

pub use models::{LedgerTransaction, TransactionKind};
pub use services::TransactionService;
