// Order collaborator record.
//
// Orders are created by the commerce layer. The ledger reads them by id-set
// when aggregating an estimate and flips their estimate linkage; it never
// edits products or totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money;
use crate::core::{LedgerError, Result};
use crate::modules::invoices::models::LineItem;

/// Whether an order has been pulled into an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEstimateState {
    /// Not yet attached to any estimate
    #[serde(rename = "pending")]
    Pending,

    /// Attached to the estimate in `assigned_estimate`
    #[serde(rename = "estimated")]
    Estimated,
}

impl std::fmt::Display for OrderEstimateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEstimateState::Pending => write!(f, "pending"),
            OrderEstimateState::Estimated => write!(f, "estimated"),
        }
    }
}

impl std::str::FromStr for OrderEstimateState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderEstimateState::Pending),
            "estimated" => Ok(OrderEstimateState::Estimated),
            _ => Err(format!("Invalid order estimate state: {}", s)),
        }
    }
}

/// A dealer purchase order, snapshotted at the ledger boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID (UUID)
    pub id: String,

    pub order_number: String,

    /// Owning dealer ID
    pub dealer: String,

    pub grand_total: Decimal,

    /// Denormalized product snapshot taken at order time
    pub products: Vec<LineItem>,

    /// Billing address snapshot
    pub bill_to: String,

    pub estimate_state: OrderEstimateState,

    /// Estimate this order is attached to, if any
    pub assigned_estimate: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        order_number: String,
        dealer: String,
        grand_total: Decimal,
        products: Vec<LineItem>,
        bill_to: String,
    ) -> Result<Self> {
        if order_number.trim().is_empty() {
            return Err(LedgerError::validation("Order number cannot be empty"));
        }
        if dealer.trim().is_empty() {
            return Err(LedgerError::validation("Order must reference a dealer"));
        }
        money::validate_amount("grand total", grand_total)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            order_number,
            dealer,
            grand_total,
            products,
            bill_to,
            estimate_state: OrderEstimateState::Pending,
            assigned_estimate: None,
            created_at: Utc::now(),
        })
    }

    /// Whether this order can still be pulled into a new estimate.
    pub fn is_estimable(&self) -> bool {
        self.estimate_state == OrderEstimateState::Pending && self.assigned_estimate.is_none()
    }
}
