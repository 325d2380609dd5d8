pub mod estimate;
pub mod tax_slab;

pub use estimate::{Estimate, EstimateKind, EstimateStatus};
pub use tax_slab::TaxSlab;
