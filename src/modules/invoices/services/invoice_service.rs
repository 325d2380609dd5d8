// Invoice generation and read surface.
//
// Generation is handed a billing snapshot when fulfillment completes; the
// packing-slip workflow itself lives outside the ledger. The invoice opens
// fully due and from then on is only touched by payment application and
// ledger corrections.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::NumberingConfig;
use crate::core::numbering::{format_number, SequenceKind};
use crate::core::{LedgerError, Result};
use crate::store::LedgerStore;

use super::super::models::{Invoice, LineItem};

/// Input for generating an invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateInvoiceRequest {
    /// Billed dealer ID
    pub dealer: String,

    /// Denormalized billing snapshot
    pub line_items: Vec<LineItem>,
}

/// Invoice service for generation and lookups.
pub struct InvoiceService {
    store: Arc<dyn LedgerStore>,
    numbering: NumberingConfig,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn LedgerStore>, numbering: NumberingConfig) -> Self {
        Self { store, numbering }
    }

    /// Generate an invoice from a billing snapshot.
    ///
    /// Validates the dealer, allocates the next invoice number, and persists
    /// the invoice fully due, all in one atomic unit.
    ///
    /// # Errors
    /// * `NotFound` - dealer does not exist
    /// * `Validation` - empty line items or invalid amounts
    pub async fn generate(&self, request: GenerateInvoiceRequest) -> Result<Invoice> {
        let mut tx = self.store.begin().await?;

        tx.get_dealer(&request.dealer)
            .await?
            .ok_or_else(|| LedgerError::not_found("Dealer", request.dealer.clone()))?;

        let sequence = tx.next_sequence(&SequenceKind::Invoice).await?;
        let invoice_number = format_number(
            &self.numbering.invoice_prefix,
            sequence,
            self.numbering.pad_width,
        );

        let invoice = Invoice::new(invoice_number, request.dealer, request.line_items)?;
        tx.insert_invoice(&invoice).await?;
        tx.commit().await?;

        tracing::info!(
            invoice_number = %invoice.invoice_number,
            dealer = %invoice.dealer,
            total_amount = %invoice.total_amount,
            "Invoice generated"
        );

        Ok(invoice)
    }

    /// Get an invoice by record ID.
    pub async fn get(&self, id: &str) -> Result<Invoice> {
        let mut tx = self.store.begin().await?;
        tx.get_invoice(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", id))
    }

    /// Get an invoice by display number.
    pub async fn find_by_number(&self, number: &str) -> Result<Invoice> {
        let mut tx = self.store.begin().await?;
        tx.find_invoice_by_number(number)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", number))
    }

    /// List a dealer's invoices, optionally only those still open.
    pub async fn list_for_dealer(&self, dealer: &str, open_only: bool) -> Result<Vec<Invoice>> {
        let mut tx = self.store.begin().await?;
        tx.list_invoices_for_dealer(dealer, open_only).await
    }

    /// Total due across a dealer's open invoices: the dealer-ledger view.
    pub async fn outstanding_balance(&self, dealer: &str) -> Result<Decimal> {
        let mut tx = self.store.begin().await?;
        let open = tx.list_invoices_for_dealer(dealer, true).await?;
        Ok(open.iter().map(|invoice| invoice.due_amount).sum())
    }
}
