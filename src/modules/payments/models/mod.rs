pub mod payment;

pub use payment::{Payment, PaymentDetail, PaymentRequest};
