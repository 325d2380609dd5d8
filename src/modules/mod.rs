pub mod credit_memos;
pub mod dealers;
pub mod estimates;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod transactions;
