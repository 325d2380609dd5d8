// Credit memo: a one-time redeemable credit grant against a dealer's
// future payment.
//
// The state machine has exactly one transition, Pending -> Redeemed, and it
// fires at most once. The grant amount is fixed at creation; amount and
// reason edits are only possible while the memo is still Pending.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money;
use crate::core::{LedgerError, Result};

/// Credit memo lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditMemoStatus {
    /// Issued, not yet applied to anything
    #[serde(rename = "pending")]
    Pending,

    /// Consumed; terminal
    #[serde(rename = "redeemed")]
    Redeemed,
}

impl Default for CreditMemoStatus {
    fn default() -> Self {
        CreditMemoStatus::Pending
    }
}

impl std::fmt::Display for CreditMemoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreditMemoStatus::Pending => write!(f, "pending"),
            CreditMemoStatus::Redeemed => write!(f, "redeemed"),
        }
    }
}

impl std::str::FromStr for CreditMemoStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" | "PENDING" => Ok(CreditMemoStatus::Pending),
            "redeemed" | "REDEEMED" => Ok(CreditMemoStatus::Redeemed),
            _ => Err(format!("Invalid credit memo status: {}", s)),
        }
    }
}

/// A dealer-scoped credit grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditMemo {
    /// Unique record ID (UUID)
    pub id: String,

    /// Display number, e.g. `LSCM0007`; unique and sequential
    pub credit_memo_id: String,

    /// Owning dealer ID
    pub dealer: String,

    /// Grant amount, fixed once redeemed
    pub amount: Decimal,

    pub reason: String,

    pub status: CreditMemoStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl CreditMemo {
    /// Create a pending memo with a freshly allocated display number.
    pub fn new(credit_memo_id: String, dealer: String, amount: Decimal, reason: String) -> Result<Self> {
        if dealer.trim().is_empty() {
            return Err(LedgerError::validation(
                "Credit memo must reference a dealer",
            ));
        }
        money::validate_positive("credit memo amount", amount)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            credit_memo_id,
            dealer,
            amount,
            reason,
            status: CreditMemoStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == CreditMemoStatus::Pending
    }

    /// Fire the one Pending -> Redeemed transition.
    ///
    /// Fails with `AlreadyRedeemed` if it has already fired; the memo is
    /// left untouched.
    pub fn redeem(&mut self) -> Result<()> {
        if !self.is_pending() {
            return Err(LedgerError::AlreadyRedeemed(self.credit_memo_id.clone()));
        }
        self.status = CreditMemoStatus::Redeemed;
        self.updated_at = Utc::now();
        Ok(())
    }
}
