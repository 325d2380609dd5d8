// Payment application.
//
// One payment may spread across several invoices and redeem one credit
// memo. Validation runs as a full pre-pass before any mutation: every
// detail is checked against the invoice's due amount (cumulatively, when
// details repeat an invoice) and the memo is checked for applicability.
// Only then do the captures run, strictly in the caller-supplied order,
// inside the same store transaction that persists the payment record. A
// failure at any step leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::core::{LedgerError, Result};
use crate::modules::credit_memos::models::CreditMemo;
use crate::modules::invoices::models::Invoice;
use crate::store::{LedgerStore, LedgerTx};

use super::super::models::{Payment, PaymentRequest};

/// Payment service: applies payments atomically across invoices.
pub struct PaymentService {
    store: Arc<dyn LedgerStore>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Apply one payment as a single atomic unit.
    ///
    /// # Errors
    /// * `EmptyPayment` - no details, or every detail is zero
    /// * `AmountMismatch` - declared total exceeds the detail sum
    /// * `NotFound` - dealer, invoice, or credit memo absent
    /// * `ExceedsDueAmount` - a detail asks for more than is due
    /// * `CreditMemoNotApplicable` / `AlreadyRedeemed` - memo rejected
    pub async fn apply(&self, request: PaymentRequest) -> Result<Payment> {
        request.validate()?;

        let mut tx = self.store.begin().await?;

        tx.get_dealer(&request.dealer)
            .await?
            .ok_or_else(|| LedgerError::not_found("Dealer", request.dealer.clone()))?;

        // Pre-pass: load every referenced invoice once and prove the whole
        // batch fits before touching anything.
        let mut invoices: Vec<Invoice> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut reserved: HashMap<String, Decimal> = HashMap::new();

        for detail in &request.details {
            if detail.amount == Decimal::ZERO {
                continue;
            }

            let slot = match index.get(&detail.invoice) {
                Some(&slot) => slot,
                None => {
                    let invoice = tx
                        .get_invoice(&detail.invoice)
                        .await?
                        .ok_or_else(|| LedgerError::not_found("Invoice", detail.invoice.clone()))?;
                    invoices.push(invoice);
                    index.insert(detail.invoice.clone(), invoices.len() - 1);
                    invoices.len() - 1
                }
            };

            let invoice = &invoices[slot];
            let already_reserved = reserved
                .get(&detail.invoice)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let remaining = invoice.due_amount - already_reserved;
            if detail.amount > remaining {
                tracing::warn!(
                    invoice_number = %invoice.invoice_number,
                    due = %remaining,
                    requested = %detail.amount,
                    "Payment detail exceeds due amount"
                );
                return Err(LedgerError::ExceedsDueAmount {
                    invoice: invoice.invoice_number.clone(),
                    due: remaining,
                    requested: detail.amount,
                });
            }
            *reserved.entry(detail.invoice.clone()).or_insert(Decimal::ZERO) += detail.amount;
        }

        let memo = self.validate_credit_memo(&mut tx, &request).await?;

        // All checks passed; now mutate.
        let payment = Payment::from_request(&request);
        tx.insert_payment(&payment).await?;

        for detail in &request.details {
            if detail.amount == Decimal::ZERO {
                continue;
            }
            let slot = index[&detail.invoice];
            let invoice = &mut invoices[slot];
            let expected_due = invoice.due_amount;
            invoice.apply_capture(detail.amount)?;
            tx.update_invoice_balance(invoice, expected_due).await?;
        }

        if let Some(mut memo) = memo {
            memo.redeem()?;
            tx.update_credit_memo(&memo).await?;
        }

        tx.commit().await?;

        tracing::info!(
            payment_id = %payment.id,
            dealer = %payment.dealer,
            total_amount = %payment.total_amount,
            invoices = invoices.len(),
            credit_memo = payment.credit_memo.as_deref().unwrap_or("none"),
            "Payment applied"
        );

        Ok(payment)
    }

    /// Get a payment by ID.
    pub async fn get(&self, id: &str) -> Result<Payment> {
        let mut tx = self.store.begin().await?;
        tx.get_payment(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Payment", id))
    }

    /// List a dealer's payments, oldest first.
    pub async fn list_for_dealer(&self, dealer: &str) -> Result<Vec<Payment>> {
        let mut tx = self.store.begin().await?;
        tx.list_payments_for_dealer(dealer).await
    }

    /// Check the optional credit memo: it must exist, belong to the paying
    /// dealer, still be pending, and not exceed the payment total.
    async fn validate_credit_memo(
        &self,
        tx: &mut Box<dyn LedgerTx>,
        request: &PaymentRequest,
    ) -> Result<Option<CreditMemo>> {
        let memo_id = match &request.credit_memo {
            Some(id) => id,
            None => return Ok(None),
        };

        let memo = tx
            .get_credit_memo(memo_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("CreditMemo", memo_id.clone()))?;

        if memo.dealer != request.dealer {
            return Err(LedgerError::CreditMemoNotApplicable {
                credit_memo: memo.credit_memo_id,
                reason: "belongs to a different dealer".to_string(),
            });
        }
        if !memo.is_pending() {
            return Err(LedgerError::AlreadyRedeemed(memo.credit_memo_id));
        }
        if memo.amount > request.total_amount {
            return Err(LedgerError::CreditMemoNotApplicable {
                credit_memo: memo.credit_memo_id,
                reason: format!(
                    "amount {} exceeds the payment total {}",
                    memo.amount, request.total_amount
                ),
            });
        }

        Ok(Some(memo))
    }
}
