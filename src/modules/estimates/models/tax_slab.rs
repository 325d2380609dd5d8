// Tax slab collaborator record. Managed elsewhere; estimate generation only
// validates the reference and snapshots the rate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money;
use crate::core::{LedgerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSlab {
    /// Unique tax slab ID (UUID)
    pub id: String,

    pub name: String,

    /// Percentage rate, e.g. `13` for 13%
    pub rate: Decimal,
}

impl TaxSlab {
    pub fn new(name: String, rate: Decimal) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(LedgerError::validation("Tax slab name cannot be empty"));
        }
        money::validate_amount("tax rate", rate)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            rate,
        })
    }
}
