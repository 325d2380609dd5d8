pub mod models;
pub mod services;

pub use models::{Estimate, EstimateKind, EstimateStatus, TaxSlab};
pub use services::EstimateService;
