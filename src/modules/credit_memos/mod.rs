pub mod models;
pub mod services;

pub use models::{CreditMemo, CreditMemoStatus};
pub use services::CreditMemoService;
