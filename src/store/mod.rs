// Unit-of-work seam between the ledger services and storage.
//
// Every financial mutation runs inside exactly one `LedgerTx`: the service
// begins a transaction, performs all reads and writes through it, and either
// commits or lets it drop. A dropped transaction rolls back, so an error
// returned mid-operation leaves no partial state. Record reads inside a
// transaction are locked reads on backends that need them (`FOR UPDATE` in
// MySQL); the embedded store serializes writers outright.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core::numbering::SequenceKind;
use crate::core::Result;
use crate::modules::credit_memos::models::CreditMemo;
use crate::modules::dealers::models::Dealer;
use crate::modules::estimates::models::{Estimate, TaxSlab};
use crate::modules::invoices::models::Invoice;
use crate::modules::orders::models::{Order, OrderEstimateState};
use crate::modules::payments::models::Payment;
use crate::modules::transactions::models::LedgerTransaction;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// A transactional ledger store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Begin an atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>>;
}

/// One atomic unit of work. All reads and writes between `begin` and
/// `commit` see and touch consistent state; dropping without commit rolls
/// everything back.
#[async_trait]
pub trait LedgerTx: Send {
    // --- sequences ---

    /// Atomically allocate the next value of a named counter. Two
    /// transactions can never receive the same value for the same counter.
    async fn next_sequence(&mut self, kind: &SequenceKind) -> Result<u64>;

    // --- dealers ---

    async fn insert_dealer(&mut self, dealer: &Dealer) -> Result<()>;
    async fn get_dealer(&mut self, id: &str) -> Result<Option<Dealer>>;

    // --- orders ---

    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Fetch the orders whose ids appear in `ids`, in no particular order.
    /// Missing ids are simply absent from the result.
    async fn get_orders_by_ids(&mut self, ids: &[String]) -> Result<Vec<Order>>;

    /// Re-point one order's estimate linkage. Returns false when the order
    /// does not exist.
    async fn update_order_estimate_link(
        &mut self,
        order_id: &str,
        state: OrderEstimateState,
        assigned_estimate: Option<&str>,
    ) -> Result<bool>;

    // --- tax slabs ---

    async fn insert_tax_slab(&mut self, slab: &TaxSlab) -> Result<()>;
    async fn get_tax_slab(&mut self, id: &str) -> Result<Option<TaxSlab>>;

    // --- invoices ---

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<()>;

    /// Locked read of one invoice by record id.
    async fn get_invoice(&mut self, id: &str) -> Result<Option<Invoice>>;

    /// Locked read of one invoice by display number.
    async fn find_invoice_by_number(&mut self, number: &str) -> Result<Option<Invoice>>;

    /// Write back a mutated invoice balance. `expected_due` is the due
    /// amount the caller read before mutating; a backend that cannot prove
    /// the row still carries it fails with a conflict instead of clobbering
    /// a concurrent capture.
    async fn update_invoice_balance(
        &mut self,
        invoice: &Invoice,
        expected_due: Decimal,
    ) -> Result<()>;

    async fn list_invoices_for_dealer(
        &mut self,
        dealer: &str,
        open_only: bool,
    ) -> Result<Vec<Invoice>>;

    // --- credit memos ---

    async fn insert_credit_memo(&mut self, memo: &CreditMemo) -> Result<()>;

    /// Locked read of one credit memo by record id.
    async fn get_credit_memo(&mut self, id: &str) -> Result<Option<CreditMemo>>;

    async fn update_credit_memo(&mut self, memo: &CreditMemo) -> Result<()>;

    async fn list_credit_memos_for_dealer(&mut self, dealer: &str) -> Result<Vec<CreditMemo>>;

    // --- payments ---

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()>;
    async fn get_payment(&mut self, id: &str) -> Result<Option<Payment>>;
    async fn list_payments_for_dealer(&mut self, dealer: &str) -> Result<Vec<Payment>>;

    // --- ledger transactions ---

    async fn insert_transaction(&mut self, transaction: &LedgerTransaction) -> Result<()>;

    /// Locked read of one ledger row by display number (`TXN....`).
    async fn find_transaction_by_number(
        &mut self,
        number: &str,
    ) -> Result<Option<LedgerTransaction>>;

    async fn update_transaction(&mut self, transaction: &LedgerTransaction) -> Result<()>;

    /// Returns false when the row does not exist.
    async fn delete_transaction(&mut self, id: &str) -> Result<bool>;

    async fn list_transactions_for_dealer(
        &mut self,
        dealer: &str,
    ) -> Result<Vec<LedgerTransaction>>;

    async fn list_transactions_for_invoice(
        &mut self,
        invoice_id: &str,
    ) -> Result<Vec<LedgerTransaction>>;

    // --- estimates ---

    async fn insert_estimate(&mut self, estimate: &Estimate) -> Result<()>;
    async fn get_estimate(&mut self, id: &str) -> Result<Option<Estimate>>;

    /// Returns false when the estimate does not exist.
    async fn delete_estimate(&mut self, id: &str) -> Result<bool>;

    async fn list_estimates_for_dealer(&mut self, dealer: &str) -> Result<Vec<Estimate>>;

    // --- control ---

    /// Make every write in this unit visible at once.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every write in this unit. Dropping the transaction has the
    /// same effect; this is for call sites that want to be explicit.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
