// Transaction adjustment math: the old capture is reversed before the new
// one applies, and the new capture is bounded by due + old.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use rust_decimal_macros::dec;

use helpers::*;
use orderledger::modules::transactions::services::{
    RecordTransactionRequest, TransactionService,
};
use orderledger::LedgerError;

fn credit_request(invoice_number: &str, amount: rust_decimal::Decimal) -> RecordTransactionRequest {
    RecordTransactionRequest {
        kind: "Credit".to_string(),
        invoice_number: Some(invoice_number.to_string()),
        credit_memo: None,
        captured_amount: Some(amount),
    }
}

#[tokio::test]
async fn test_adjust_moves_invoice_with_the_row() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(90)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    // capture 30: due drops to 60
    let row = service
        .record(credit_request(&invoice.invoice_number, dec!(30)))
        .await
        .unwrap();

    // raising the capture to 50: due = 60 + 30 - 50 = 40
    let adjusted = service.adjust(&row.transaction_id, dec!(50)).await.unwrap();
    assert_eq!(adjusted.captured_amount, dec!(50));

    let after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(after.due_amount, dec!(40));
    assert_eq!(after.paid_amount, dec!(50));
}

#[tokio::test]
async fn test_adjust_down_restores_due_amount() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let row = service
        .record(credit_request(&invoice.invoice_number, dec!(80)))
        .await
        .unwrap();
    service.adjust(&row.transaction_id, dec!(20)).await.unwrap();

    let after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(after.due_amount, dec!(80));
    assert_eq!(after.paid_amount, dec!(20));
}

#[tokio::test]
async fn test_adjust_bounded_by_due_plus_old() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(60)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let row = service
        .record(credit_request(&invoice.invoice_number, dec!(30)))
        .await
        .unwrap();

    // available = due (30) + old capture (30) = 60; 61 must fail
    let err = service.adjust(&row.transaction_id, dec!(61)).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ExceedsAvailableDue { available, requested, .. }
            if available == dec!(60) && requested == dec!(61)
    ));

    // boundary value passes
    service.adjust(&row.transaction_id, dec!(60)).await.unwrap();
    let after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(after.due_amount, dec!(0));
}

#[tokio::test]
async fn test_adjust_requires_positive_amount() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(60)).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let row = service
        .record(credit_request(&invoice.invoice_number, dec!(30)))
        .await
        .unwrap();

    assert!(service.adjust(&row.transaction_id, dec!(0)).await.is_err());

    let after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(after.due_amount, dec!(30));
}

#[tokio::test]
async fn test_adjust_unknown_transaction_is_not_found() {
    let store = store();
    seed_dealer(&store).await;
    let service = TransactionService::new(Arc::clone(&store), numbering());

    let err = service.adjust("TXN9999", dec!(10)).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::NotFound { entity: "Transaction", .. }
    ));
}
