// Invoice model and balance engine.
//
// An invoice is a permanent financial record: created once when fulfillment
// completes, never deleted, and mutated only through `apply_capture` /
// `reverse_capture` below. Those two methods are the sole path that touches
// due_amount and paid_amount, and both re-derive the status through the one
// pure function, so `due + paid == total` and `due >= 0` hold at every
// commit point.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::line_item::LineItem;
use crate::core::money;
use crate::core::{LedgerError, Result};

/// Invoice payment status, always derived from the amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// Nothing captured yet
    #[serde(rename = "unpaid")]
    Unpaid,

    /// Some amount captured, balance still due
    #[serde(rename = "partially_paid")]
    PartiallyPaid,

    /// Due amount exhausted
    #[serde(rename = "fully_paid")]
    FullyPaid,
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Unpaid => write!(f, "unpaid"),
            InvoiceStatus::PartiallyPaid => write!(f, "partially_paid"),
            InvoiceStatus::FullyPaid => write!(f, "fully_paid"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            "partially_paid" => Ok(InvoiceStatus::PartiallyPaid),
            "fully_paid" => Ok(InvoiceStatus::FullyPaid),
            _ => Err(format!("Invalid invoice status: {}", s)),
        }
    }
}

impl InvoiceStatus {
    /// The single status derivation. No call site computes status ad hoc;
    /// every balance mutation ends by calling this.
    pub fn derive(due_amount: Decimal, paid_amount: Decimal) -> InvoiceStatus {
        if due_amount <= Decimal::ZERO {
            InvoiceStatus::FullyPaid
        } else if paid_amount > Decimal::ZERO {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Unpaid
        }
    }
}

/// A dealer invoice with its running balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique invoice ID (UUID)
    pub id: String,

    /// Display number, e.g. `LSIN0042`; unique and sequential
    pub invoice_number: String,

    /// Owning dealer ID
    pub dealer: String,

    /// Denormalized billing snapshot
    pub line_items: Vec<LineItem>,

    pub total_amount: Decimal,

    /// Remaining unpaid balance
    pub due_amount: Decimal,

    /// Sum of all captures to date
    pub paid_amount: Decimal,

    pub status: InvoiceStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Create a new invoice from a billing snapshot.
    ///
    /// The total is computed from the line items; the invoice opens fully
    /// due with nothing paid.
    ///
    /// # Arguments
    /// * `invoice_number` - Freshly allocated display number
    /// * `dealer` - Owning dealer ID
    /// * `line_items` - Billing snapshot (must not be empty)
    pub fn new(invoice_number: String, dealer: String, line_items: Vec<LineItem>) -> Result<Self> {
        if dealer.trim().is_empty() {
            return Err(LedgerError::validation("Invoice must reference a dealer"));
        }
        if line_items.is_empty() {
            return Err(LedgerError::validation(
                "Invoice must have at least one line item",
            ));
        }

        let total_amount: Decimal = line_items.iter().map(|item| item.subtotal()).sum();
        money::validate_positive("total amount", total_amount)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            dealer,
            line_items,
            total_amount,
            due_amount: total_amount,
            paid_amount: Decimal::ZERO,
            status: InvoiceStatus::Unpaid,
            created_at: now,
            updated_at: now,
        })
    }

    /// Capture `amount` against this invoice's due balance.
    ///
    /// Requires `0 < amount <= due_amount`; fails with
    /// `InsufficientDueAmount` otherwise, leaving the invoice untouched.
    pub fn apply_capture(&mut self, amount: Decimal) -> Result<()> {
        money::validate_positive("capture amount", amount)?;
        if amount > self.due_amount {
            return Err(LedgerError::InsufficientDueAmount {
                invoice: self.invoice_number.clone(),
                due: self.due_amount,
                requested: amount,
            });
        }

        self.due_amount -= amount;
        self.paid_amount += amount;
        self.recompute_status();
        Ok(())
    }

    /// Undo a prior capture of `amount`, restoring the due balance.
    ///
    /// Used when a ledger transaction is adjusted or removed. A reversal
    /// that would drive `paid_amount` negative means the ledger and the
    /// invoice disagree about history; that is `LedgerCorruption`, not a
    /// caller error.
    pub fn reverse_capture(&mut self, amount: Decimal) -> Result<()> {
        money::validate_positive("reversal amount", amount)?;
        if amount > self.paid_amount {
            return Err(LedgerError::LedgerCorruption {
                invoice: self.invoice_number.clone(),
                amount,
            });
        }

        self.due_amount += amount;
        self.paid_amount -= amount;
        self.recompute_status();
        Ok(())
    }

    /// Whether the invoice can still absorb captures.
    pub fn is_open(&self) -> bool {
        self.status != InvoiceStatus::FullyPaid
    }

    fn recompute_status(&mut self) {
        self.status = InvoiceStatus::derive(self.due_amount, self.paid_amount);
        self.updated_at = Utc::now();
    }
}
