// Estimate: a pre-invoice billing aggregate over one or more orders.
//
// Estimates group a dealer's orders under one due date and total. Orders are
// exclusive to one estimate at a time; deleting the estimate releases them
// back to Pending.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money;
use crate::core::{LedgerError, Result};

/// Which kind of billing document this estimate represents. The kind picks
/// the number prefix and how the total is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateKind {
    /// Pre-invoice quote; total supplied by the caller
    #[serde(rename = "estimate")]
    Estimate,

    /// Invoice-type aggregate; total summed from the orders
    #[serde(rename = "invoice")]
    Invoice,
}

impl std::fmt::Display for EstimateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimateKind::Estimate => write!(f, "estimate"),
            EstimateKind::Invoice => write!(f, "invoice"),
        }
    }
}

impl std::str::FromStr for EstimateKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "estimate" => Ok(EstimateKind::Estimate),
            "invoice" => Ok(EstimateKind::Invoice),
            _ => Err(format!("Invalid estimate kind: {}", s)),
        }
    }
}

/// Settlement state of the estimate itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateStatus {
    #[serde(rename = "unpaid")]
    Unpaid,

    #[serde(rename = "paid")]
    Paid,
}

impl std::fmt::Display for EstimateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimateStatus::Unpaid => write!(f, "unpaid"),
            EstimateStatus::Paid => write!(f, "paid"),
        }
    }
}

impl std::str::FromStr for EstimateStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(EstimateStatus::Unpaid),
            "paid" => Ok(EstimateStatus::Paid),
            _ => Err(format!("Invalid estimate status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimate {
    /// Unique record ID (UUID)
    pub id: String,

    /// Daily-sequential display number, e.g. `EST-20240301-002`
    pub estimate_number: String,

    /// Owning dealer ID
    pub dealer: String,

    /// Orders bundled into this estimate
    pub orders: Vec<String>,

    /// Referenced tax slab ID
    pub tax_slab: String,

    pub total_amount: Decimal,

    pub due_amount: Decimal,

    pub due_date: NaiveDate,

    pub status: EstimateStatus,

    pub kind: EstimateKind,

    pub created_at: DateTime<Utc>,
}

impl Estimate {
    pub fn new(
        estimate_number: String,
        dealer: String,
        orders: Vec<String>,
        tax_slab: String,
        total_amount: Decimal,
        due_date: NaiveDate,
        kind: EstimateKind,
    ) -> Result<Self> {
        if orders.is_empty() {
            return Err(LedgerError::validation(
                "Estimate must reference at least one order",
            ));
        }
        money::validate_positive("estimate total", total_amount)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            estimate_number,
            dealer,
            orders,
            tax_slab,
            total_amount,
            due_amount: total_amount,
            due_date,
            status: EstimateStatus::Unpaid,
            kind,
            created_at: Utc::now(),
        })
    }
}
