pub mod error;
pub mod money;
pub mod numbering;

pub use error::{ErrorKind, LedgerError, Result};
