pub mod credit_memo;

pub use credit_memo::{CreditMemo, CreditMemoStatus};
