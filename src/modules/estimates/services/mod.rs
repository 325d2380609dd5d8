pub mod estimate_service;

pub use estimate_service::{EstimateService, GenerateEstimateRequest};
