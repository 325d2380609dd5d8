// Transaction ledger round-trips: record, adjust, and remove keep the
// invoice balance and the ledger rows in lockstep; Debit rows are terminal.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use rust_decimal_macros::dec;

use helpers::*;
use orderledger::modules::credit_memos::models::CreditMemoStatus;
use orderledger::modules::invoices::models::InvoiceStatus;
use orderledger::modules::transactions::models::TransactionKind;
use orderledger::modules::transactions::services::{
    RecordTransactionRequest, TransactionService,
};
use orderledger::LedgerError;

fn credit_request(invoice_number: &str, amount: rust_decimal::Decimal) -> RecordTransactionRequest {
    RecordTransactionRequest {
        kind: "credit".to_string(),
        invoice_number: Some(invoice_number.to_string()),
        credit_memo: None,
        captured_amount: Some(amount),
    }
}

fn debit_request(memo_id: &str) -> RecordTransactionRequest {
    RecordTransactionRequest {
        kind: "debit".to_string(),
        invoice_number: None,
        credit_memo: Some(memo_id.to_string()),
        captured_amount: None,
    }
}

#[tokio::test]
async fn test_credit_record_captures_and_lands_in_the_ledger() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let row = service
        .record(credit_request(&invoice.invoice_number, dec!(40)))
        .await
        .unwrap();

    assert_eq!(row.kind, TransactionKind::Credit);
    assert_eq!(row.transaction_id, "TXN0001");
    assert_eq!(row.invoice.as_deref(), Some(invoice.id.as_str()));

    let after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(after.due_amount, dec!(60));
    assert_eq!(after.status, InvoiceStatus::PartiallyPaid);

    let statement = service.list_for_invoice(&invoice.id).await.unwrap();
    assert_eq!(statement.len(), 1);
    assert_eq!(statement[0].transaction_id, "TXN0001");
}

#[tokio::test]
async fn test_credit_against_settled_invoice_rejected() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(50)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    service
        .record(credit_request(&invoice.invoice_number, dec!(50)))
        .await
        .unwrap();

    let err = service
        .record(credit_request(&invoice.invoice_number, dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientDueAmount { .. }));
}

#[tokio::test]
async fn test_debit_record_redeems_the_memo() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(75)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let row = service.record(debit_request(&memo.id)).await.unwrap();

    assert_eq!(row.kind, TransactionKind::Debit);
    assert_eq!(row.captured_amount, dec!(75));
    assert_eq!(row.credit_memo.as_deref(), Some(memo.id.as_str()));

    let memo_after = fetch_credit_memo(&store, &memo.id).await;
    assert_eq!(memo_after.status, CreditMemoStatus::Redeemed);

    // the memo cannot be redeemed through the ledger twice
    let err = service.record(debit_request(&memo.id)).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyRedeemed(_)));
    assert_eq!(service.list_for_dealer(&dealer.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_restores_the_captured_amount() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let row = service
        .record(credit_request(&invoice.invoice_number, dec!(40)))
        .await
        .unwrap();
    service.remove(&row.transaction_id).await.unwrap();

    let after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(after.due_amount, dec!(100));
    assert_eq!(after.paid_amount, dec!(0));
    assert_eq!(after.status, InvoiceStatus::Unpaid);

    let err = service.get(&row.transaction_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
async fn test_debit_rows_refuse_adjust_and_remove() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(75)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let row = service.record(debit_request(&memo.id)).await.unwrap();

    let err = service.adjust(&row.transaction_id, dec!(10)).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = service.remove(&row.transaction_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    // the row is still there, untouched
    let fetched = service.get(&row.transaction_id).await.unwrap();
    assert_eq!(fetched.captured_amount, dec!(75));
}

#[tokio::test]
async fn test_record_adjust_remove_round_trip() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let row = service
        .record(credit_request(&invoice.invoice_number, dec!(30)))
        .await
        .unwrap();
    service.adjust(&row.transaction_id, dec!(70)).await.unwrap();

    let mid = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(mid.due_amount, dec!(30));
    assert_eq!(mid.paid_amount, dec!(70));

    service.remove(&row.transaction_id).await.unwrap();

    let after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(after.due_amount, dec!(100));
    assert_eq!(after.paid_amount, dec!(0));
    assert!(service.list_for_invoice(&invoice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_kind_rejected_before_any_lookup() {
    let store = store();
    seed_dealer(&store).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let err = service
        .record(RecordTransactionRequest {
            kind: "refund".to_string(),
            invoice_number: None,
            credit_memo: None,
            captured_amount: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidTransactionType(ref s) if s == "refund"));
}
