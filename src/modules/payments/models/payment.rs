// Payment model: one payment event spread across one or more invoices,
// optionally consuming a credit memo.
//
// Payments are immutable once applied. There is no update path; corrections
// go through the transaction ledger, which knows how to reverse a capture.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money;
use crate::core::{LedgerError, Result};

/// One slice of a payment, applied to a single invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetail {
    /// Invoice ID this slice applies to
    pub invoice: String,

    pub amount: Decimal,
}

/// Caller input for applying a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    /// Paying dealer ID
    pub dealer: String,

    /// Declared payment total; must be covered by the detail sum
    pub total_amount: Decimal,

    /// e.g. "full", "partial"
    pub payment_type: String,

    /// Settlement mode, e.g. "cheque", "wire"
    pub mode: String,

    /// Credit memo to redeem as part of this payment, if any
    pub credit_memo: Option<String>,

    /// Applied strictly in this order; never re-sorted
    pub details: Vec<PaymentDetail>,
}

impl PaymentRequest {
    /// Structural validation, before any record is consulted.
    ///
    /// Rejects an empty or all-zero detail list (`EmptyPayment`), negative
    /// or over-precise amounts, and a declared total the details cannot
    /// cover (`AmountMismatch`).
    pub fn validate(&self) -> Result<()> {
        if self.dealer.trim().is_empty() {
            return Err(LedgerError::validation("Payment must reference a dealer"));
        }
        money::validate_positive("payment total", self.total_amount)?;

        for detail in &self.details {
            if detail.invoice.trim().is_empty() {
                return Err(LedgerError::validation(
                    "Payment detail must reference an invoice",
                ));
            }
            money::validate_amount("payment detail amount", detail.amount)?;
        }

        if self.details.is_empty()
            || self.details.iter().all(|d| d.amount == Decimal::ZERO)
        {
            return Err(LedgerError::EmptyPayment);
        }

        let detail_sum = self.detail_sum();
        if self.total_amount > detail_sum {
            return Err(LedgerError::AmountMismatch {
                declared: self.total_amount,
                detailed: detail_sum,
            });
        }

        Ok(())
    }

    pub fn detail_sum(&self) -> Decimal {
        self.details.iter().map(|d| d.amount).sum()
    }
}

/// A recorded payment event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment ID (UUID)
    pub id: String,

    pub dealer: String,

    pub total_amount: Decimal,

    pub payment_type: String,

    pub mode: String,

    /// Credit memo redeemed by this payment, if any
    pub credit_memo: Option<String>,

    pub details: Vec<PaymentDetail>,

    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Build the permanent record from a validated request.
    pub fn from_request(request: &PaymentRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            dealer: request.dealer.clone(),
            total_amount: request.total_amount,
            payment_type: request.payment_type.clone(),
            mode: request.mode.clone(),
            credit_memo: request.credit_memo.clone(),
            details: request.details.clone(),
            created_at: Utc::now(),
        }
    }
}
