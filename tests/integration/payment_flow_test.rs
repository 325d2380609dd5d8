// Full payment application flow against the embedded store: multi-invoice
// spread, credit memo redemption, and all-or-nothing failure behavior.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use rust_decimal_macros::dec;

use helpers::*;
use orderledger::modules::credit_memos::models::CreditMemoStatus;
use orderledger::modules::invoices::models::InvoiceStatus;
use orderledger::modules::payments::models::{PaymentDetail, PaymentRequest};
use orderledger::modules::payments::services::PaymentService;
use orderledger::LedgerError;

fn detail(invoice: &str, amount: rust_decimal::Decimal) -> PaymentDetail {
    PaymentDetail {
        invoice: invoice.to_string(),
        amount,
    }
}

#[tokio::test]
async fn test_payment_spreads_across_invoices_in_caller_order() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let first = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let second = seed_invoice(&store, &dealer.id, dec!(200)).await;
    let service = PaymentService::new(Arc::clone(&store));

    let payment = service
        .apply(PaymentRequest {
            dealer: dealer.id.clone(),
            total_amount: dec!(150),
            payment_type: "partial".to_string(),
            mode: "wire".to_string(),
            credit_memo: None,
            details: vec![detail(&first.id, dec!(100)), detail(&second.id, dec!(50))],
        })
        .await
        .unwrap();

    assert_eq!(payment.details.len(), 2);

    let first_after = fetch_invoice(&store, &first.id).await;
    assert_eq!(first_after.due_amount, dec!(0));
    assert_eq!(first_after.status, InvoiceStatus::FullyPaid);

    let second_after = fetch_invoice(&store, &second.id).await;
    assert_eq!(second_after.due_amount, dec!(150));
    assert_eq!(second_after.paid_amount, dec!(50));
    assert_eq!(second_after.status, InvoiceStatus::PartiallyPaid);

    let listed = service.list_for_dealer(&dealer.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, payment.id);
}

#[tokio::test]
async fn test_payment_redeems_credit_memo_atomically() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(40)).await;
    let service = PaymentService::new(Arc::clone(&store));

    service
        .apply(PaymentRequest {
            dealer: dealer.id.clone(),
            total_amount: dec!(100),
            payment_type: "full".to_string(),
            mode: "wire".to_string(),
            credit_memo: Some(memo.id.clone()),
            details: vec![detail(&invoice.id, dec!(100))],
        })
        .await
        .unwrap();

    let memo_after = fetch_credit_memo(&store, &memo.id).await;
    assert_eq!(memo_after.status, CreditMemoStatus::Redeemed);

    let invoice_after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(invoice_after.status, InvoiceStatus::FullyPaid);
}

#[tokio::test]
async fn test_redeemed_memo_rejected_and_nothing_changes() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(40)).await;
    let service = PaymentService::new(Arc::clone(&store));

    // consume the memo with a first payment
    service
        .apply(PaymentRequest {
            dealer: dealer.id.clone(),
            total_amount: dec!(50),
            payment_type: "partial".to_string(),
            mode: "wire".to_string(),
            credit_memo: Some(memo.id.clone()),
            details: vec![detail(&invoice.id, dec!(50))],
        })
        .await
        .unwrap();

    let err = service
        .apply(PaymentRequest {
            dealer: dealer.id.clone(),
            total_amount: dec!(50),
            payment_type: "partial".to_string(),
            mode: "wire".to_string(),
            credit_memo: Some(memo.id.clone()),
            details: vec![detail(&invoice.id, dec!(50))],
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::AlreadyRedeemed(_)));

    // the second payment left no trace: invoice still half due, one payment
    let invoice_after = fetch_invoice(&store, &invoice.id).await;
    assert_eq!(invoice_after.due_amount, dec!(50));
    assert_eq!(service.list_for_dealer(&dealer.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_memo_of_another_dealer_is_not_applicable() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let other = {
        let other = orderledger::modules::dealers::models::Dealer::new(
            "Northline Distributors".to_string(),
            "Quebec".to_string(),
            15,
            dec!(10000),
        )
        .unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_dealer(&other).await.unwrap();
        tx.commit().await.unwrap();
        other
    };
    let invoice = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let foreign_memo = seed_credit_memo(&store, &other.id, dec!(40)).await;
    let service = PaymentService::new(Arc::clone(&store));

    let err = service
        .apply(PaymentRequest {
            dealer: dealer.id.clone(),
            total_amount: dec!(100),
            payment_type: "full".to_string(),
            mode: "wire".to_string(),
            credit_memo: Some(foreign_memo.id.clone()),
            details: vec![detail(&invoice.id, dec!(100))],
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::CreditMemoNotApplicable { .. }));

    let memo_after = fetch_credit_memo(&store, &foreign_memo.id).await;
    assert_eq!(memo_after.status, CreditMemoStatus::Pending);
}

#[tokio::test]
async fn test_memo_larger_than_payment_total_is_not_applicable() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let invoice = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(80)).await;
    let service = PaymentService::new(Arc::clone(&store));

    let err = service
        .apply(PaymentRequest {
            dealer: dealer.id.clone(),
            total_amount: dec!(50),
            payment_type: "partial".to_string(),
            mode: "wire".to_string(),
            credit_memo: Some(memo.id.clone()),
            details: vec![detail(&invoice.id, dec!(50))],
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::CreditMemoNotApplicable { .. }));
}

#[tokio::test]
async fn test_failing_third_detail_leaves_first_two_untouched() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let first = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let second = seed_invoice(&store, &dealer.id, dec!(100)).await;
    let third = seed_invoice(&store, &dealer.id, dec!(10)).await;
    let service = PaymentService::new(Arc::clone(&store));

    let err = service
        .apply(PaymentRequest {
            dealer: dealer.id.clone(),
            total_amount: dec!(150),
            payment_type: "partial".to_string(),
            mode: "wire".to_string(),
            credit_memo: None,
            details: vec![
                detail(&first.id, dec!(50)),
                detail(&second.id, dec!(50)),
                // more than the third invoice has due
                detail(&third.id, dec!(50)),
            ],
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::ExceedsDueAmount { .. }));

    for invoice in [&first, &second, &third] {
        let after = fetch_invoice(&store, &invoice.id).await;
        assert_eq!(after.due_amount, invoice.total_amount);
        assert_eq!(after.paid_amount, dec!(0));
        assert_eq!(after.status, InvoiceStatus::Unpaid);
    }
    assert!(service.list_for_dealer(&dealer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_outstanding_balance_tracks_open_due_amounts() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let first = seed_invoice(&store, &dealer.id, dec!(100)).await;
    seed_invoice(&store, &dealer.id, dec!(50)).await;
    let payments = PaymentService::new(Arc::clone(&store));
    let invoices = orderledger::modules::invoices::services::InvoiceService::new(
        Arc::clone(&store),
        numbering(),
    );

    assert_eq!(
        invoices.outstanding_balance(&dealer.id).await.unwrap(),
        dec!(150)
    );

    payments
        .apply(PaymentRequest {
            dealer: dealer.id.clone(),
            total_amount: dec!(100),
            payment_type: "full".to_string(),
            mode: "wire".to_string(),
            credit_memo: None,
            details: vec![detail(&first.id, dec!(100))],
        })
        .await
        .unwrap();

    assert_eq!(
        invoices.outstanding_balance(&dealer.id).await.unwrap(),
        dec!(50)
    );
}
