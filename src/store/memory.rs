// Embedded ledger store.
//
// Writes are serialized: `begin` takes ownership of the whole state behind
// an async mutex and clones a snapshot. Commit keeps the mutated state;
// rollback (or drop) restores the snapshot. One writer at a time makes
// every transaction trivially serializable, which is exactly the isolation
// the balance invariants need, and snapshot restore gives all-or-nothing
// semantics without a log.
//
// This is the backend the test suite drives; production deployments use the
// MySQL store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::numbering::SequenceKind;
use crate::core::{LedgerError, Result};
use crate::modules::credit_memos::models::CreditMemo;
use crate::modules::dealers::models::Dealer;
use crate::modules::estimates::models::{Estimate, TaxSlab};
use crate::modules::invoices::models::Invoice;
use crate::modules::orders::models::{Order, OrderEstimateState};
use crate::modules::payments::models::Payment;
use crate::modules::transactions::models::LedgerTransaction;

use super::{LedgerStore, LedgerTx};

#[derive(Debug, Default, Clone)]
struct State {
    dealers: HashMap<String, Dealer>,
    orders: HashMap<String, Order>,
    tax_slabs: HashMap<String, TaxSlab>,
    invoices: HashMap<String, Invoice>,
    credit_memos: HashMap<String, CreditMemo>,
    payments: HashMap<String, Payment>,
    transactions: HashMap<String, LedgerTransaction>,
    estimates: HashMap<String, Estimate>,
    sequences: HashMap<String, u64>,
}

/// In-process ledger store with serialized write transactions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

/// One serialized unit of work over the embedded state.
pub struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    /// State as of `begin`; present until commit, restored on drop.
    snapshot: Option<State>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        // Not committed: put the world back the way begin found it.
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn next_sequence(&mut self, kind: &SequenceKind) -> Result<u64> {
        let counter = self.guard.sequences.entry(kind.key()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_dealer(&mut self, dealer: &Dealer) -> Result<()> {
        if self.guard.dealers.contains_key(&dealer.id) {
            return Err(LedgerError::conflict(format!(
                "dealer {} already exists",
                dealer.id
            )));
        }
        self.guard.dealers.insert(dealer.id.clone(), dealer.clone());
        Ok(())
    }

    async fn get_dealer(&mut self, id: &str) -> Result<Option<Dealer>> {
        Ok(self.guard.dealers.get(id).cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.guard.orders.contains_key(&order.id) {
            return Err(LedgerError::conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        self.guard.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get_orders_by_ids(&mut self, ids: &[String]) -> Result<Vec<Order>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.guard.orders.get(id).cloned())
            .collect())
    }

    async fn update_order_estimate_link(
        &mut self,
        order_id: &str,
        state: OrderEstimateState,
        assigned_estimate: Option<&str>,
    ) -> Result<bool> {
        match self.guard.orders.get_mut(order_id) {
            Some(order) => {
                order.estimate_state = state;
                order.assigned_estimate = assigned_estimate.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_tax_slab(&mut self, slab: &TaxSlab) -> Result<()> {
        self.guard.tax_slabs.insert(slab.id.clone(), slab.clone());
        Ok(())
    }

    async fn get_tax_slab(&mut self, id: &str) -> Result<Option<TaxSlab>> {
        Ok(self.guard.tax_slabs.get(id).cloned())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        if self.guard.invoices.contains_key(&invoice.id) {
            return Err(LedgerError::conflict(format!(
                "invoice {} already exists",
                invoice.id
            )));
        }
        if self
            .guard
            .invoices
            .values()
            .any(|existing| existing.invoice_number == invoice.invoice_number)
        {
            return Err(LedgerError::conflict(format!(
                "invoice number {} already allocated",
                invoice.invoice_number
            )));
        }
        self.guard
            .invoices
            .insert(invoice.id.clone(), invoice.clone());
        Ok(())
    }

    async fn get_invoice(&mut self, id: &str) -> Result<Option<Invoice>> {
        Ok(self.guard.invoices.get(id).cloned())
    }

    async fn find_invoice_by_number(&mut self, number: &str) -> Result<Option<Invoice>> {
        Ok(self
            .guard
            .invoices
            .values()
            .find(|invoice| invoice.invoice_number == number)
            .cloned())
    }

    async fn update_invoice_balance(
        &mut self,
        invoice: &Invoice,
        expected_due: Decimal,
    ) -> Result<()> {
        let stored = self
            .guard
            .invoices
            .get_mut(&invoice.id)
            .ok_or_else(|| LedgerError::not_found("Invoice", invoice.id.clone()))?;

        // Writers are serialized, so a mismatch here means the caller read
        // the balance outside this transaction.
        if stored.due_amount != expected_due {
            return Err(LedgerError::conflict(format!(
                "invoice {} balance changed underneath this transaction",
                invoice.invoice_number
            )));
        }

        *stored = invoice.clone();
        Ok(())
    }

    async fn list_invoices_for_dealer(
        &mut self,
        dealer: &str,
        open_only: bool,
    ) -> Result<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self
            .guard
            .invoices
            .values()
            .filter(|invoice| invoice.dealer == dealer)
            .filter(|invoice| !open_only || invoice.is_open())
            .cloned()
            .collect();
        invoices.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));
        Ok(invoices)
    }

    async fn insert_credit_memo(&mut self, memo: &CreditMemo) -> Result<()> {
        if self.guard.credit_memos.contains_key(&memo.id) {
            return Err(LedgerError::conflict(format!(
                "credit memo {} already exists",
                memo.id
            )));
        }
        self.guard
            .credit_memos
            .insert(memo.id.clone(), memo.clone());
        Ok(())
    }

    async fn get_credit_memo(&mut self, id: &str) -> Result<Option<CreditMemo>> {
        Ok(self.guard.credit_memos.get(id).cloned())
    }

    async fn update_credit_memo(&mut self, memo: &CreditMemo) -> Result<()> {
        let stored = self
            .guard
            .credit_memos
            .get_mut(&memo.id)
            .ok_or_else(|| LedgerError::not_found("CreditMemo", memo.id.clone()))?;
        *stored = memo.clone();
        Ok(())
    }

    async fn list_credit_memos_for_dealer(&mut self, dealer: &str) -> Result<Vec<CreditMemo>> {
        let mut memos: Vec<CreditMemo> = self
            .guard
            .credit_memos
            .values()
            .filter(|memo| memo.dealer == dealer)
            .cloned()
            .collect();
        memos.sort_by(|a, b| a.credit_memo_id.cmp(&b.credit_memo_id));
        Ok(memos)
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        self.guard
            .payments
            .insert(payment.id.clone(), payment.clone());
        Ok(())
    }

    async fn get_payment(&mut self, id: &str) -> Result<Option<Payment>> {
        Ok(self.guard.payments.get(id).cloned())
    }

    async fn list_payments_for_dealer(&mut self, dealer: &str) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .guard
            .payments
            .values()
            .filter(|payment| payment.dealer == dealer)
            .cloned()
            .collect();
        payments.sort_by_key(|payment| payment.created_at);
        Ok(payments)
    }

    async fn insert_transaction(&mut self, transaction: &LedgerTransaction) -> Result<()> {
        self.guard
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    async fn find_transaction_by_number(
        &mut self,
        number: &str,
    ) -> Result<Option<LedgerTransaction>> {
        Ok(self
            .guard
            .transactions
            .values()
            .find(|row| row.transaction_id == number)
            .cloned())
    }

    async fn update_transaction(&mut self, transaction: &LedgerTransaction) -> Result<()> {
        let stored = self
            .guard
            .transactions
            .get_mut(&transaction.id)
            .ok_or_else(|| LedgerError::not_found("Transaction", transaction.id.clone()))?;
        *stored = transaction.clone();
        Ok(())
    }

    async fn delete_transaction(&mut self, id: &str) -> Result<bool> {
        Ok(self.guard.transactions.remove(id).is_some())
    }

    async fn list_transactions_for_dealer(
        &mut self,
        dealer: &str,
    ) -> Result<Vec<LedgerTransaction>> {
        let mut rows: Vec<LedgerTransaction> = self
            .guard
            .transactions
            .values()
            .filter(|row| row.dealer == dealer)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
        Ok(rows)
    }

    async fn list_transactions_for_invoice(
        &mut self,
        invoice_id: &str,
    ) -> Result<Vec<LedgerTransaction>> {
        let mut rows: Vec<LedgerTransaction> = self
            .guard
            .transactions
            .values()
            .filter(|row| row.invoice.as_deref() == Some(invoice_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
        Ok(rows)
    }

    async fn insert_estimate(&mut self, estimate: &Estimate) -> Result<()> {
        self.guard
            .estimates
            .insert(estimate.id.clone(), estimate.clone());
        Ok(())
    }

    async fn get_estimate(&mut self, id: &str) -> Result<Option<Estimate>> {
        Ok(self.guard.estimates.get(id).cloned())
    }

    async fn delete_estimate(&mut self, id: &str) -> Result<bool> {
        Ok(self.guard.estimates.remove(id).is_some())
    }

    async fn list_estimates_for_dealer(&mut self, dealer: &str) -> Result<Vec<Estimate>> {
        let mut estimates: Vec<Estimate> = self
            .guard
            .estimates
            .values()
            .filter(|estimate| estimate.dealer == dealer)
            .cloned()
            .collect();
        estimates.sort_by(|a, b| a.estimate_number.cmp(&b.estimate_number));
        Ok(estimates)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        // Forget the snapshot; Drop then leaves the mutated state in place.
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Drop restores the snapshot.
        Ok(())
    }
}
