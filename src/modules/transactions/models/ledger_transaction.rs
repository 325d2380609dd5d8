// Ledger transaction: one row per capture or redemption event.
//
// Credit rows capture an amount against an invoice's due balance; Debit rows
// redeem a credit memo and never touch an invoice directly. Credit rows may
// later be adjusted or removed, which reverses their effect on the invoice;
// Debit rows are terminal because un-redeeming a memo is forbidden.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money;
use crate::core::{LedgerError, Result};

/// What a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Capture against an invoice's due amount
    #[serde(rename = "credit")]
    Credit,

    /// Redemption of a credit memo
    #[serde(rename = "debit")]
    Debit,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Credit => write!(f, "credit"),
            TransactionKind::Debit => write!(f, "debit"),
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = LedgerError;

    /// Boundary strings arrive in either case; anything that is not
    /// Credit or Debit is `InvalidTransactionType`.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "credit" => Ok(TransactionKind::Credit),
            "debit" => Ok(TransactionKind::Debit),
            _ => Err(LedgerError::InvalidTransactionType(s.to_string())),
        }
    }
}

/// An immutable-by-default ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique record ID (UUID)
    pub id: String,

    /// Display number, e.g. `TXN0013`; unique and sequential
    pub transaction_id: String,

    pub kind: TransactionKind,

    /// Dealer the event belongs to
    pub dealer: String,

    /// Invoice captured against; set for Credit rows
    pub invoice: Option<String>,

    /// Memo redeemed; set for Debit rows
    pub credit_memo: Option<String>,

    pub captured_amount: Decimal,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// A Credit row capturing `captured_amount` against `invoice`.
    pub fn credit(
        transaction_id: String,
        dealer: String,
        invoice: String,
        captured_amount: Decimal,
    ) -> Result<Self> {
        money::validate_positive("captured amount", captured_amount)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            transaction_id,
            kind: TransactionKind::Credit,
            dealer,
            invoice: Some(invoice),
            credit_memo: None,
            captured_amount,
            created_at: now,
            updated_at: now,
        })
    }

    /// A Debit row redeeming `credit_memo` for `amount`.
    pub fn debit(
        transaction_id: String,
        dealer: String,
        credit_memo: String,
        amount: Decimal,
    ) -> Result<Self> {
        money::validate_positive("redeemed amount", amount)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            transaction_id,
            kind: TransactionKind::Debit,
            dealer,
            invoice: None,
            credit_memo: Some(credit_memo),
            captured_amount: amount,
            created_at: now,
            updated_at: now,
        })
    }
}
