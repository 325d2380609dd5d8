// MySQL ledger store.
//
// One `LedgerTx` wraps one `sqlx` transaction. Balance-bearing reads take
// row locks (`SELECT ... FOR UPDATE`) and balance writes re-check the due
// amount the caller read, so a concurrent capture that slipped in between
// surfaces as a retryable conflict instead of a silent overwrite. Document
// numbers come from a `sequences` table incremented under a row lock.
//
// Denormalized snapshots (line items, order products, payment details,
// estimate order lists) are stored as JSON columns: they are immutable
// once written and are never queried by field.

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::{MySql, MySqlPool, MySqlRow};
use sqlx::{QueryBuilder, Row, Transaction};

use crate::config::DatabaseConfig;
use crate::core::numbering::SequenceKind;
use crate::core::{LedgerError, Result};
use crate::modules::credit_memos::models::{CreditMemo, CreditMemoStatus};
use crate::modules::dealers::models::Dealer;
use crate::modules::estimates::models::{Estimate, EstimateKind, EstimateStatus, TaxSlab};
use crate::modules::invoices::models::{Invoice, InvoiceStatus};
use crate::modules::orders::models::{Order, OrderEstimateState};
use crate::modules::payments::models::Payment;
use crate::modules::transactions::models::{LedgerTransaction, TransactionKind};

use super::{LedgerStore, LedgerTx};

/// MySQL-backed ledger store.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured pool options.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(config.create_pool().await?))
    }

    /// Run embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTx { tx }))
    }
}

pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

// Row decoding. A stored value that fails to parse means the table was
// edited outside the ledger; surface it rather than guessing.

fn corrupt(what: &str, detail: impl std::fmt::Display) -> LedgerError {
    LedgerError::validation(format!("stored {} is invalid: {}", what, detail))
}

fn dealer_from_row(row: &MySqlRow) -> Result<Dealer> {
    Ok(Dealer {
        id: row.try_get("id")?,
        company_name: row.try_get("company_name")?,
        province: row.try_get("province")?,
        credit_due_days: row.try_get("credit_due_days")?,
        credit_due_amount: row.try_get("credit_due_amount")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_from_row(row: &MySqlRow) -> Result<Order> {
    let products: String = row.try_get("products")?;
    let state: String = row.try_get("estimate_state")?;
    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        dealer: row.try_get("dealer")?,
        grand_total: row.try_get("grand_total")?,
        products: serde_json::from_str(&products)?,
        bill_to: row.try_get("bill_to")?,
        estimate_state: OrderEstimateState::from_str(&state)
            .map_err(|e| corrupt("order estimate state", e))?,
        assigned_estimate: row.try_get("assigned_estimate")?,
        created_at: row.try_get("created_at")?,
    })
}

fn invoice_from_row(row: &MySqlRow) -> Result<Invoice> {
    let line_items: String = row.try_get("line_items")?;
    let status: String = row.try_get("status")?;
    Ok(Invoice {
        id: row.try_get("id")?,
        invoice_number: row.try_get("invoice_number")?,
        dealer: row.try_get("dealer")?,
        line_items: serde_json::from_str(&line_items)?,
        total_amount: row.try_get("total_amount")?,
        due_amount: row.try_get("due_amount")?,
        paid_amount: row.try_get("paid_amount")?,
        status: InvoiceStatus::from_str(&status).map_err(|e| corrupt("invoice status", e))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn credit_memo_from_row(row: &MySqlRow) -> Result<CreditMemo> {
    let status: String = row.try_get("status")?;
    Ok(CreditMemo {
        id: row.try_get("id")?,
        credit_memo_id: row.try_get("credit_memo_id")?,
        dealer: row.try_get("dealer")?,
        amount: row.try_get("amount")?,
        reason: row.try_get("reason")?,
        status: CreditMemoStatus::from_str(&status)
            .map_err(|e| corrupt("credit memo status", e))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn payment_from_row(row: &MySqlRow) -> Result<Payment> {
    let details: String = row.try_get("details")?;
    Ok(Payment {
        id: row.try_get("id")?,
        dealer: row.try_get("dealer")?,
        total_amount: row.try_get("total_amount")?,
        payment_type: row.try_get("payment_type")?,
        mode: row.try_get("mode")?,
        credit_memo: row.try_get("credit_memo")?,
        details: serde_json::from_str(&details)?,
        created_at: row.try_get("created_at")?,
    })
}

fn transaction_from_row(row: &MySqlRow) -> Result<LedgerTransaction> {
    let kind: String = row.try_get("kind")?;
    Ok(LedgerTransaction {
        id: row.try_get("id")?,
        transaction_id: row.try_get("transaction_id")?,
        kind: TransactionKind::from_str(&kind)?,
        dealer: row.try_get("dealer")?,
        invoice: row.try_get("invoice")?,
        credit_memo: row.try_get("credit_memo")?,
        captured_amount: row.try_get("captured_amount")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn estimate_from_row(row: &MySqlRow) -> Result<Estimate> {
    let orders: String = row.try_get("order_ids")?;
    let status: String = row.try_get("status")?;
    let kind: String = row.try_get("kind")?;
    Ok(Estimate {
        id: row.try_get("id")?,
        estimate_number: row.try_get("estimate_number")?,
        dealer: row.try_get("dealer")?,
        orders: serde_json::from_str(&orders)?,
        tax_slab: row.try_get("tax_slab")?,
        total_amount: row.try_get("total_amount")?,
        due_amount: row.try_get("due_amount")?,
        due_date: row.try_get("due_date")?,
        status: EstimateStatus::from_str(&status).map_err(|e| corrupt("estimate status", e))?,
        kind: EstimateKind::from_str(&kind).map_err(|e| corrupt("estimate kind", e))?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_unique_violation(err: sqlx::Error, what: &str) -> LedgerError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return LedgerError::conflict(format!("{} already exists", what));
        }
    }
    LedgerError::Database(err)
}

#[async_trait]
impl LedgerTx for MySqlTx {
    async fn next_sequence(&mut self, kind: &SequenceKind) -> Result<u64> {
        let key = kind.key();

        let current: Option<u64> =
            sqlx::query_scalar("SELECT value FROM sequences WHERE name = ? FOR UPDATE")
                .bind(&key)
                .fetch_optional(&mut *self.tx)
                .await?;

        match current {
            Some(value) => {
                let next = value + 1;
                sqlx::query("UPDATE sequences SET value = ? WHERE name = ?")
                    .bind(next)
                    .bind(&key)
                    .execute(&mut *self.tx)
                    .await?;
                Ok(next)
            }
            None => {
                // Two transactions may race to create the counter; the
                // loser hits the primary key and retries the whole unit.
                sqlx::query("INSERT INTO sequences (name, value) VALUES (?, 1)")
                    .bind(&key)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(|e| map_unique_violation(e, "sequence"))?;
                Ok(1)
            }
        }
    }

    async fn insert_dealer(&mut self, dealer: &Dealer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dealers
                (id, company_name, province, credit_due_days, credit_due_amount, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&dealer.id)
        .bind(&dealer.company_name)
        .bind(&dealer.province)
        .bind(dealer.credit_due_days)
        .bind(dealer.credit_due_amount)
        .bind(dealer.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "dealer"))?;
        Ok(())
    }

    async fn get_dealer(&mut self, id: &str) -> Result<Option<Dealer>> {
        let row = sqlx::query("SELECT * FROM dealers WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(dealer_from_row).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, order_number, dealer, grand_total, products, bill_to,
                 estimate_state, assigned_estimate, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.dealer)
        .bind(order.grand_total)
        .bind(serde_json::to_string(&order.products)?)
        .bind(&order.bill_to)
        .bind(order.estimate_state.to_string())
        .bind(&order.assigned_estimate)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "order"))?;
        Ok(())
    }

    async fn get_orders_by_ids(&mut self, ids: &[String]) -> Result<Vec<Order>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        builder.push(") FOR UPDATE");

        let rows = builder.build().fetch_all(&mut *self.tx).await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn update_order_estimate_link(
        &mut self,
        order_id: &str,
        state: OrderEstimateState,
        assigned_estimate: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET estimate_state = ?, assigned_estimate = ? WHERE id = ?",
        )
        .bind(state.to_string())
        .bind(assigned_estimate)
        .bind(order_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_tax_slab(&mut self, slab: &TaxSlab) -> Result<()> {
        sqlx::query("INSERT INTO tax_slabs (id, name, rate) VALUES (?, ?, ?)")
            .bind(&slab.id)
            .bind(&slab.name)
            .bind(slab.rate)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_unique_violation(e, "tax slab"))?;
        Ok(())
    }

    async fn get_tax_slab(&mut self, id: &str) -> Result<Option<TaxSlab>> {
        let row = sqlx::query("SELECT id, name, rate FROM tax_slabs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        match row {
            Some(row) => Ok(Some(TaxSlab {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                rate: row.try_get("rate")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices
                (id, invoice_number, dealer, line_items, total_amount,
                 due_amount, paid_amount, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.dealer)
        .bind(serde_json::to_string(&invoice.line_items)?)
        .bind(invoice.total_amount)
        .bind(invoice.due_amount)
        .bind(invoice.paid_amount)
        .bind(invoice.status.to_string())
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "invoice"))?;
        Ok(())
    }

    async fn get_invoice(&mut self, id: &str) -> Result<Option<Invoice>> {
        let row = sqlx::query("SELECT * FROM invoices WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn find_invoice_by_number(&mut self, number: &str) -> Result<Option<Invoice>> {
        let row = sqlx::query("SELECT * FROM invoices WHERE invoice_number = ? FOR UPDATE")
            .bind(number)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn update_invoice_balance(
        &mut self,
        invoice: &Invoice,
        expected_due: Decimal,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET due_amount = ?, paid_amount = ?, status = ?, updated_at = ?
            WHERE id = ? AND due_amount = ?
            "#,
        )
        .bind(invoice.due_amount)
        .bind(invoice.paid_amount)
        .bind(invoice.status.to_string())
        .bind(invoice.updated_at)
        .bind(&invoice.id)
        .bind(expected_due)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM invoices WHERE id = ?")
                .bind(&invoice.id)
                .fetch_optional(&mut *self.tx)
                .await?;
            return Err(match exists {
                Some(_) => LedgerError::conflict(format!(
                    "invoice {} balance changed underneath this transaction",
                    invoice.invoice_number
                )),
                None => LedgerError::not_found("Invoice", invoice.id.clone()),
            });
        }
        Ok(())
    }

    async fn list_invoices_for_dealer(
        &mut self,
        dealer: &str,
        open_only: bool,
    ) -> Result<Vec<Invoice>> {
        let query = if open_only {
            "SELECT * FROM invoices WHERE dealer = ? AND status <> 'fully_paid' \
             ORDER BY invoice_number"
        } else {
            "SELECT * FROM invoices WHERE dealer = ? ORDER BY invoice_number"
        };
        let rows = sqlx::query(query)
            .bind(dealer)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(invoice_from_row).collect()
    }

    async fn insert_credit_memo(&mut self, memo: &CreditMemo) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO credit_memos
                (id, credit_memo_id, dealer, amount, reason, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&memo.id)
        .bind(&memo.credit_memo_id)
        .bind(&memo.dealer)
        .bind(memo.amount)
        .bind(&memo.reason)
        .bind(memo.status.to_string())
        .bind(memo.created_at)
        .bind(memo.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "credit memo"))?;
        Ok(())
    }

    async fn get_credit_memo(&mut self, id: &str) -> Result<Option<CreditMemo>> {
        let row = sqlx::query("SELECT * FROM credit_memos WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(credit_memo_from_row).transpose()
    }

    async fn update_credit_memo(&mut self, memo: &CreditMemo) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE credit_memos
            SET amount = ?, reason = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(memo.amount)
        .bind(&memo.reason)
        .bind(memo.status.to_string())
        .bind(memo.updated_at)
        .bind(&memo.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("CreditMemo", memo.id.clone()));
        }
        Ok(())
    }

    async fn list_credit_memos_for_dealer(&mut self, dealer: &str) -> Result<Vec<CreditMemo>> {
        let rows =
            sqlx::query("SELECT * FROM credit_memos WHERE dealer = ? ORDER BY credit_memo_id")
                .bind(dealer)
                .fetch_all(&mut *self.tx)
                .await?;
        rows.iter().map(credit_memo_from_row).collect()
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (id, dealer, total_amount, payment_type, mode, credit_memo, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.dealer)
        .bind(payment.total_amount)
        .bind(&payment.payment_type)
        .bind(&payment.mode)
        .bind(&payment.credit_memo)
        .bind(serde_json::to_string(&payment.details)?)
        .bind(payment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "payment"))?;
        Ok(())
    }

    async fn get_payment(&mut self, id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query("SELECT * FROM payments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn list_payments_for_dealer(&mut self, dealer: &str) -> Result<Vec<Payment>> {
        let rows = sqlx::query("SELECT * FROM payments WHERE dealer = ? ORDER BY created_at")
            .bind(dealer)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn insert_transaction(&mut self, transaction: &LedgerTransaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_transactions
                (id, transaction_id, kind, dealer, invoice, credit_memo,
                 captured_amount, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.transaction_id)
        .bind(transaction.kind.to_string())
        .bind(&transaction.dealer)
        .bind(&transaction.invoice)
        .bind(&transaction.credit_memo)
        .bind(transaction.captured_amount)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "transaction"))?;
        Ok(())
    }

    async fn find_transaction_by_number(
        &mut self,
        number: &str,
    ) -> Result<Option<LedgerTransaction>> {
        let row =
            sqlx::query("SELECT * FROM ledger_transactions WHERE transaction_id = ? FOR UPDATE")
                .bind(number)
                .fetch_optional(&mut *self.tx)
                .await?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn update_transaction(&mut self, transaction: &LedgerTransaction) -> Result<()> {
        let result = sqlx::query(
            "UPDATE ledger_transactions SET captured_amount = ?, updated_at = ? WHERE id = ?",
        )
        .bind(transaction.captured_amount)
        .bind(transaction.updated_at)
        .bind(&transaction.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found(
                "Transaction",
                transaction.id.clone(),
            ));
        }
        Ok(())
    }

    async fn delete_transaction(&mut self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ledger_transactions WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_transactions_for_dealer(
        &mut self,
        dealer: &str,
    ) -> Result<Vec<LedgerTransaction>> {
        let rows = sqlx::query(
            "SELECT * FROM ledger_transactions WHERE dealer = ? ORDER BY transaction_id",
        )
        .bind(dealer)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn list_transactions_for_invoice(
        &mut self,
        invoice_id: &str,
    ) -> Result<Vec<LedgerTransaction>> {
        let rows = sqlx::query(
            "SELECT * FROM ledger_transactions WHERE invoice = ? ORDER BY transaction_id",
        )
        .bind(invoice_id)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn insert_estimate(&mut self, estimate: &Estimate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO estimates
                (id, estimate_number, dealer, order_ids, tax_slab, total_amount,
                 due_amount, due_date, status, kind, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&estimate.id)
        .bind(&estimate.estimate_number)
        .bind(&estimate.dealer)
        .bind(serde_json::to_string(&estimate.orders)?)
        .bind(&estimate.tax_slab)
        .bind(estimate.total_amount)
        .bind(estimate.due_amount)
        .bind(estimate.due_date)
        .bind(estimate.status.to_string())
        .bind(estimate.kind.to_string())
        .bind(estimate.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "estimate"))?;
        Ok(())
    }

    async fn get_estimate(&mut self, id: &str) -> Result<Option<Estimate>> {
        let row = sqlx::query("SELECT * FROM estimates WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(estimate_from_row).transpose()
    }

    async fn delete_estimate(&mut self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM estimates WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_estimates_for_dealer(&mut self, dealer: &str) -> Result<Vec<Estimate>> {
        let rows = sqlx::query("SELECT * FROM estimates WHERE dealer = ? ORDER BY estimate_number")
            .bind(dealer)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(estimate_from_row).collect()
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
