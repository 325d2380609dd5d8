// Credit memo lifecycle: Pending -> Redeemed exactly once, edits only
// while Pending, explicit status writes restricted to real states.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use rust_decimal_macros::dec;

use helpers::*;
use orderledger::modules::credit_memos::models::CreditMemoStatus;
use orderledger::modules::credit_memos::services::{
    CreateCreditMemoRequest, CreditMemoService, UpdateCreditMemoRequest,
};
use orderledger::LedgerError;

#[tokio::test]
async fn test_create_allocates_sequential_numbers() {
    let store = store();
    let dealer = seed_dealer(&store).await;

    let first = seed_credit_memo(&store, &dealer.id, dec!(50)).await;
    let second = seed_credit_memo(&store, &dealer.id, dec!(25)).await;

    assert_eq!(first.credit_memo_id, "LSCM0001");
    assert_eq!(second.credit_memo_id, "LSCM0002");
    assert_eq!(first.status, CreditMemoStatus::Pending);
}

#[tokio::test]
async fn test_create_requires_existing_dealer() {
    let store = store();
    let service = CreditMemoService::new(Arc::clone(&store), numbering());

    let err = service
        .create(CreateCreditMemoRequest {
            dealer: "ghost".to_string(),
            amount: dec!(50),
            reason: "n/a".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::NotFound { entity: "Dealer", .. }));
}

#[tokio::test]
async fn test_create_requires_positive_amount() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let service = CreditMemoService::new(Arc::clone(&store), numbering());

    let err = service
        .create(CreateCreditMemoRequest {
            dealer: dealer.id,
            amount: dec!(0),
            reason: "n/a".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn test_redeem_exactly_once() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(50)).await;
    let service = CreditMemoService::new(Arc::clone(&store), numbering());

    let redeemed = service.redeem(&memo.id).await.unwrap();
    assert_eq!(redeemed.status, CreditMemoStatus::Redeemed);

    let err = service.redeem(&memo.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyRedeemed(ref id) if id == "LSCM0001"));

    // state unchanged by the failed second redemption
    let after = fetch_credit_memo(&store, &memo.id).await;
    assert_eq!(after.status, CreditMemoStatus::Redeemed);
}

#[tokio::test]
async fn test_update_while_pending() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(50)).await;
    let service = CreditMemoService::new(Arc::clone(&store), numbering());

    let updated = service
        .update(
            &memo.id,
            UpdateCreditMemoRequest {
                amount: Some(dec!(75)),
                reason: Some("Short shipment".to_string()),
                status: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.amount, dec!(75));
    assert_eq!(updated.reason, "Short shipment");
    assert_eq!(updated.status, CreditMemoStatus::Pending);
}

#[tokio::test]
async fn test_update_rejects_unknown_status() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(50)).await;
    let service = CreditMemoService::new(Arc::clone(&store), numbering());

    let err = service
        .update(
            &memo.id,
            UpdateCreditMemoRequest {
                status: Some("cancelled".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidStatus(ref s) if s == "cancelled"));
}

#[tokio::test]
async fn test_update_can_redeem_explicitly() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(50)).await;
    let service = CreditMemoService::new(Arc::clone(&store), numbering());

    let updated = service
        .update(
            &memo.id,
            UpdateCreditMemoRequest {
                status: Some("redeemed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, CreditMemoStatus::Redeemed);
}

#[tokio::test]
async fn test_redeemed_memo_refuses_updates() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let memo = seed_credit_memo(&store, &dealer.id, dec!(50)).await;
    let service = CreditMemoService::new(Arc::clone(&store), numbering());

    service.redeem(&memo.id).await.unwrap();

    let err = service
        .update(
            &memo.id,
            UpdateCreditMemoRequest {
                amount: Some(dec!(10)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::AlreadyRedeemed(_)));

    let after = fetch_credit_memo(&store, &memo.id).await;
    assert_eq!(after.amount, dec!(50));
}

#[tokio::test]
async fn test_list_is_scoped_to_dealer() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    seed_credit_memo(&store, &dealer.id, dec!(50)).await;
    let service = CreditMemoService::new(Arc::clone(&store), numbering());

    assert_eq!(service.list_for_dealer(&dealer.id).await.unwrap().len(), 1);
    assert!(service.list_for_dealer("other").await.unwrap().is_empty());
}
