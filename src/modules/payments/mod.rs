pub mod models;
pub mod services;

pub use models::{Payment, PaymentDetail, PaymentRequest};
pub use services::PaymentService;
