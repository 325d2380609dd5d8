// Transaction ledger: record, adjust, and remove capture events.
//
// A Credit row and its invoice move together: recording applies the
// capture, adjusting reverses the old amount before applying the new one,
// and removing reverses it entirely. Debit rows redeem a credit memo, and
// since a memo can never return to Pending, Debit rows are terminal and
// refuse adjustment and removal.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::NumberingConfig;
use crate::core::money;
use crate::core::numbering::{format_number, SequenceKind};
use crate::core::{LedgerError, Result};
use crate::store::LedgerStore;

use super::super::models::{LedgerTransaction, TransactionKind};

/// Input for recording a ledger transaction. `kind` arrives as a boundary
/// string; anything but Credit or Debit is rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordTransactionRequest {
    pub kind: String,

    /// Invoice display number to capture against; required for Credit
    pub invoice_number: Option<String>,

    /// Credit memo record ID to redeem; required for Debit
    pub credit_memo: Option<String>,

    /// Amount to capture; required for Credit. Debit rows record the
    /// memo's own amount.
    pub captured_amount: Option<Decimal>,
}

/// Transaction ledger service.
pub struct TransactionService {
    store: Arc<dyn LedgerStore>,
    numbering: NumberingConfig,
}

impl TransactionService {
    pub fn new(store: Arc<dyn LedgerStore>, numbering: NumberingConfig) -> Self {
        Self { store, numbering }
    }

    /// Record a capture or redemption event.
    ///
    /// Credit: resolves the invoice by number, applies the capture, and
    /// writes the ledger row. Debit: resolves the memo, redeems it, and
    /// writes the ledger row. Either way one atomic unit.
    ///
    /// # Errors
    /// * `InvalidTransactionType` - kind is neither Credit nor Debit
    /// * `NotFound` - invoice or memo absent
    /// * `InsufficientDueAmount` - capture exceeds what the invoice has due
    /// * `AlreadyRedeemed` - memo was consumed earlier
    pub async fn record(&self, request: RecordTransactionRequest) -> Result<LedgerTransaction> {
        let kind = TransactionKind::from_str(&request.kind)?;
        match kind {
            TransactionKind::Credit => self.record_credit(request).await,
            TransactionKind::Debit => self.record_debit(request).await,
        }
    }

    async fn record_credit(&self, request: RecordTransactionRequest) -> Result<LedgerTransaction> {
        let invoice_number = request.invoice_number.as_deref().ok_or_else(|| {
            LedgerError::validation("Credit transaction must reference an invoice number")
        })?;
        let amount = request.captured_amount.ok_or_else(|| {
            LedgerError::validation("Credit transaction must carry a captured amount")
        })?;
        money::validate_positive("captured amount", amount)?;

        let mut tx = self.store.begin().await?;

        let mut invoice = tx
            .find_invoice_by_number(invoice_number)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", invoice_number))?;

        if !invoice.is_open() {
            tracing::warn!(
                invoice_number = %invoice.invoice_number,
                "Capture attempted against a fully paid invoice"
            );
            return Err(LedgerError::InsufficientDueAmount {
                invoice: invoice.invoice_number,
                due: invoice.due_amount,
                requested: amount,
            });
        }

        let expected_due = invoice.due_amount;
        invoice.apply_capture(amount)?;

        let sequence = tx.next_sequence(&SequenceKind::Transaction).await?;
        let transaction_id = format_number(
            &self.numbering.transaction_prefix,
            sequence,
            self.numbering.pad_width,
        );
        let row = LedgerTransaction::credit(
            transaction_id,
            invoice.dealer.clone(),
            invoice.id.clone(),
            amount,
        )?;

        tx.update_invoice_balance(&invoice, expected_due).await?;
        tx.insert_transaction(&row).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %row.transaction_id,
            invoice_number = %invoice.invoice_number,
            captured_amount = %amount,
            due_amount = %invoice.due_amount,
            "Credit transaction recorded"
        );

        Ok(row)
    }

    async fn record_debit(&self, request: RecordTransactionRequest) -> Result<LedgerTransaction> {
        let memo_id = request.credit_memo.as_deref().ok_or_else(|| {
            LedgerError::validation("Debit transaction must reference a credit memo")
        })?;

        let mut tx = self.store.begin().await?;

        let mut memo = tx
            .get_credit_memo(memo_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("CreditMemo", memo_id))?;

        memo.redeem()?;

        let sequence = tx.next_sequence(&SequenceKind::Transaction).await?;
        let transaction_id = format_number(
            &self.numbering.transaction_prefix,
            sequence,
            self.numbering.pad_width,
        );
        let row = LedgerTransaction::debit(
            transaction_id,
            memo.dealer.clone(),
            memo.id.clone(),
            memo.amount,
        )?;

        tx.insert_transaction(&row).await?;
        tx.update_credit_memo(&memo).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %row.transaction_id,
            credit_memo_id = %memo.credit_memo_id,
            amount = %memo.amount,
            "Debit transaction recorded"
        );

        Ok(row)
    }

    /// Re-state a Credit row's captured amount, moving the invoice with it.
    ///
    /// The old capture is reversed before the new one applies, so the new
    /// amount may use everything the invoice has due plus what this row
    /// had already captured, but no more (`ExceedsAvailableDue`).
    pub async fn adjust(
        &self,
        transaction_number: &str,
        new_captured: Decimal,
    ) -> Result<LedgerTransaction> {
        money::validate_positive("captured amount", new_captured)?;

        let mut tx = self.store.begin().await?;

        let mut row = tx
            .find_transaction_by_number(transaction_number)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", transaction_number))?;

        let invoice_id = match (row.kind, &row.invoice) {
            (TransactionKind::Credit, Some(invoice_id)) => invoice_id.clone(),
            _ => {
                return Err(LedgerError::validation(
                    "Debit transactions are terminal and cannot be adjusted",
                ))
            }
        };

        let mut invoice = tx
            .get_invoice(&invoice_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", invoice_id))?;

        let available = invoice.due_amount + row.captured_amount;
        if new_captured > available {
            return Err(LedgerError::ExceedsAvailableDue {
                invoice: invoice.invoice_number,
                available,
                requested: new_captured,
            });
        }

        let expected_due = invoice.due_amount;
        invoice.reverse_capture(row.captured_amount)?;
        invoice.apply_capture(new_captured)?;

        row.captured_amount = new_captured;
        row.updated_at = Utc::now();

        tx.update_invoice_balance(&invoice, expected_due).await?;
        tx.update_transaction(&row).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %row.transaction_id,
            invoice_number = %invoice.invoice_number,
            captured_amount = %new_captured,
            due_amount = %invoice.due_amount,
            "Transaction adjusted"
        );

        Ok(row)
    }

    /// Remove a Credit row, restoring its captured amount to the invoice.
    pub async fn remove(&self, transaction_number: &str) -> Result<()> {
        let mut tx = self.store.begin().await?;

        let row = tx
            .find_transaction_by_number(transaction_number)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", transaction_number))?;

        let invoice_id = match (row.kind, &row.invoice) {
            (TransactionKind::Credit, Some(invoice_id)) => invoice_id.clone(),
            _ => {
                return Err(LedgerError::validation(
                    "Debit transactions are terminal and cannot be removed",
                ))
            }
        };

        let mut invoice = tx
            .get_invoice(&invoice_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", invoice_id))?;

        let expected_due = invoice.due_amount;
        invoice.reverse_capture(row.captured_amount)?;

        tx.update_invoice_balance(&invoice, expected_due).await?;
        tx.delete_transaction(&row.id).await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %row.transaction_id,
            invoice_number = %invoice.invoice_number,
            reversed_amount = %row.captured_amount,
            due_amount = %invoice.due_amount,
            "Transaction removed"
        );

        Ok(())
    }

    /// Get a ledger row by display number.
    pub async fn get(&self, transaction_number: &str) -> Result<LedgerTransaction> {
        let mut tx = self.store.begin().await?;
        tx.find_transaction_by_number(transaction_number)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", transaction_number))
    }

    /// List a dealer's ledger rows by transaction number.
    pub async fn list_for_dealer(&self, dealer: &str) -> Result<Vec<LedgerTransaction>> {
        let mut tx = self.store.begin().await?;
        tx.list_transactions_for_dealer(dealer).await
    }

    /// The statement view: every capture recorded against one invoice.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> Result<Vec<LedgerTransaction>> {
        let mut tx = self.store.begin().await?;
        tx.list_transactions_for_invoice(invoice_id).await
    }
}
