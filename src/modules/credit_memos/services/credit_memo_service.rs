// Credit memo lifecycle.
//
// A memo is editable only while Pending. Redemption happens here, through
// payment application, or through a Debit ledger transaction; whichever
// path fires first wins, and every later attempt fails.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::NumberingConfig;
use crate::core::money;
use crate::core::numbering::{format_number, SequenceKind};
use crate::core::{LedgerError, Result};
use crate::store::LedgerStore;

use super::super::models::{CreditMemo, CreditMemoStatus};

/// Input for issuing a credit memo.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCreditMemoRequest {
    /// Granted dealer ID
    pub dealer: String,

    pub amount: Decimal,

    pub reason: String,
}

/// Partial update of a pending memo. `status` arrives as a boundary string
/// and must name a real state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCreditMemoRequest {
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
    pub status: Option<String>,
}

/// Credit memo service.
pub struct CreditMemoService {
    store: Arc<dyn LedgerStore>,
    numbering: NumberingConfig,
}

impl CreditMemoService {
    pub fn new(store: Arc<dyn LedgerStore>, numbering: NumberingConfig) -> Self {
        Self { store, numbering }
    }

    /// Issue a new pending memo with a freshly allocated `LSCM` number.
    ///
    /// # Errors
    /// * `Validation` - amount not strictly positive
    /// * `NotFound` - dealer does not exist
    pub async fn create(&self, request: CreateCreditMemoRequest) -> Result<CreditMemo> {
        money::validate_positive("credit memo amount", request.amount)?;

        let mut tx = self.store.begin().await?;

        tx.get_dealer(&request.dealer)
            .await?
            .ok_or_else(|| LedgerError::not_found("Dealer", request.dealer.clone()))?;

        let sequence = tx.next_sequence(&SequenceKind::CreditMemo).await?;
        let credit_memo_id = format_number(
            &self.numbering.credit_memo_prefix,
            sequence,
            self.numbering.pad_width,
        );

        let memo = CreditMemo::new(credit_memo_id, request.dealer, request.amount, request.reason)?;
        tx.insert_credit_memo(&memo).await?;
        tx.commit().await?;

        tracing::info!(
            credit_memo_id = %memo.credit_memo_id,
            dealer = %memo.dealer,
            amount = %memo.amount,
            "Credit memo issued"
        );

        Ok(memo)
    }

    /// Update a memo while it is still pending.
    ///
    /// An explicit status may only name `pending` or `redeemed`; anything
    /// else is `InvalidStatus`. Setting `redeemed` fires the one
    /// redemption transition.
    pub async fn update(&self, id: &str, request: UpdateCreditMemoRequest) -> Result<CreditMemo> {
        // Reject a bad status string before loading anything.
        let new_status = request
            .status
            .as_deref()
            .map(|s| CreditMemoStatus::from_str(s).map_err(|_| LedgerError::InvalidStatus(s.to_string())))
            .transpose()?;

        let mut tx = self.store.begin().await?;

        let mut memo = tx
            .get_credit_memo(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("CreditMemo", id))?;

        if !memo.is_pending() {
            return Err(LedgerError::AlreadyRedeemed(memo.credit_memo_id));
        }

        if let Some(amount) = request.amount {
            money::validate_positive("credit memo amount", amount)?;
            memo.amount = amount;
        }
        if let Some(reason) = request.reason {
            memo.reason = reason;
        }
        match new_status {
            Some(CreditMemoStatus::Redeemed) => memo.redeem()?,
            Some(CreditMemoStatus::Pending) | None => {}
        }
        memo.updated_at = chrono::Utc::now();

        tx.update_credit_memo(&memo).await?;
        tx.commit().await?;

        Ok(memo)
    }

    /// Redeem a pending memo.
    ///
    /// # Errors
    /// * `NotFound` - memo does not exist
    /// * `AlreadyRedeemed` - the transition already fired
    pub async fn redeem(&self, id: &str) -> Result<CreditMemo> {
        let mut tx = self.store.begin().await?;

        let mut memo = tx
            .get_credit_memo(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("CreditMemo", id))?;

        memo.redeem()?;
        tx.update_credit_memo(&memo).await?;
        tx.commit().await?;

        tracing::info!(
            credit_memo_id = %memo.credit_memo_id,
            dealer = %memo.dealer,
            amount = %memo.amount,
            "Credit memo redeemed"
        );

        Ok(memo)
    }

    /// Get a memo by record ID.
    pub async fn get(&self, id: &str) -> Result<CreditMemo> {
        let mut tx = self.store.begin().await?;
        tx.get_credit_memo(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("CreditMemo", id))
    }

    /// List a dealer's memos by memo number.
    pub async fn list_for_dealer(&self, dealer: &str) -> Result<Vec<CreditMemo>> {
        let mut tx = self.store.begin().await?;
        tx.list_credit_memos_for_dealer(dealer).await
    }
}
