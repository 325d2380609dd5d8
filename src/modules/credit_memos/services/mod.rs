pub mod credit_memo_service;

pub use credit_memo_service::{CreateCreditMemoRequest, CreditMemoService, UpdateCreditMemoRequest};
