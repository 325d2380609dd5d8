// Dealer collaborator record.
//
// Dealers are managed elsewhere; the ledger only reads them to validate
// references, scope credit memos, and compute estimate due dates from
// payment terms. No dealer business logic lives here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money;
use crate::core::{LedgerError, Result};

/// A dealer account the ledger bills against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dealer {
    /// Unique dealer ID (UUID)
    pub id: String,

    pub company_name: String,

    pub province: String,

    /// Payment-term length in days, used for estimate due dates
    pub credit_due_days: u32,

    /// Credit ceiling extended to this dealer
    pub credit_due_amount: Decimal,

    pub created_at: DateTime<Utc>,
}

impl Dealer {
    pub fn new(
        company_name: String,
        province: String,
        credit_due_days: u32,
        credit_due_amount: Decimal,
    ) -> Result<Self> {
        if company_name.trim().is_empty() {
            return Err(LedgerError::validation("Company name cannot be empty"));
        }
        money::validate_amount("credit due amount", credit_due_amount)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            company_name,
            province,
            credit_due_days,
            credit_due_amount,
            created_at: Utc::now(),
        })
    }
}
