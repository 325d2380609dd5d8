// Estimate aggregation flow: generation links orders atomically, deletion
// releases them, and ownership mismatches abort before anything changes.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;

use helpers::*;
use orderledger::modules::estimates::models::{EstimateKind, EstimateStatus};
use orderledger::modules::estimates::services::{EstimateService, GenerateEstimateRequest};
use orderledger::modules::orders::models::{Order, OrderEstimateState};
use orderledger::store::LedgerStore;
use orderledger::LedgerError;

fn service(store: &Arc<dyn LedgerStore>) -> EstimateService {
    EstimateService::new(Arc::clone(store), numbering(), billing())
}

async fn fetch_order(store: &Arc<dyn LedgerStore>, id: &str) -> Order {
    let mut tx = store.begin().await.unwrap();
    let orders = tx.get_orders_by_ids(&[id.to_string()]).await.unwrap();
    orders.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_generate_links_every_order() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let slab = seed_tax_slab(&store).await;
    let first = seed_order(&store, &dealer.id, "ORD-1001", dec!(300)).await;
    let second = seed_order(&store, &dealer.id, "ORD-1002", dec!(200)).await;

    let estimate = service(&store)
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![first.id.clone(), second.id.clone()],
            tax_slab: slab.id.clone(),
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(565)),
            due_date: None,
        })
        .await
        .unwrap();

    assert_eq!(estimate.total_amount, dec!(565));
    assert_eq!(estimate.status, EstimateStatus::Unpaid);
    assert_eq!(estimate.orders.len(), 2);

    let today = Utc::now().date_naive();
    let stamp = today.format("%Y%m%d");
    assert_eq!(estimate.estimate_number, format!("EST-{stamp}-001"));
    // dealer has 30-day terms
    assert_eq!(estimate.due_date, today + Duration::days(30));

    for order_id in [&first.id, &second.id] {
        let order = fetch_order(&store, order_id).await;
        assert_eq!(order.estimate_state, OrderEstimateState::Estimated);
        assert_eq!(order.assigned_estimate.as_deref(), Some(estimate.id.as_str()));
    }
}

#[tokio::test]
async fn test_invoice_kind_sums_totals_from_orders() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let slab = seed_tax_slab(&store).await;
    let first = seed_order(&store, &dealer.id, "ORD-1001", dec!(300)).await;
    let second = seed_order(&store, &dealer.id, "ORD-1002", dec!(200)).await;

    let estimate = service(&store)
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![first.id, second.id],
            tax_slab: slab.id,
            kind: EstimateKind::Invoice,
            grand_total: None,
            due_date: Some(NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()),
        })
        .await
        .unwrap();

    assert_eq!(estimate.total_amount, dec!(500));
    assert_eq!(estimate.due_amount, dec!(500));
    assert!(estimate.estimate_number.starts_with("INV-"));
    assert_eq!(
        estimate.due_date,
        NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()
    );
}

#[tokio::test]
async fn test_foreign_orders_abort_with_nothing_linked() {
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
    let slab = seed_tax_slab(&store).await;
    let own = seed_order(&store, &dealer.id, "ORD-1001", dec!(300)).await;
    let foreign = seed_order(&store, &other.id, "ORD-2001", dec!(200)).await;

    let err = service(&store)
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![own.id.clone(), foreign.id.clone()],
            tax_slab: slab.id,
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(500)),
            due_date: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LedgerError::OrdersDoNotBelongToDealer { requested: 2, matched: 1, .. }
    ));

    // neither order picked up a link
    for order_id in [&own.id, &foreign.id] {
        let order = fetch_order(&store, order_id).await;
        assert!(order.is_estimable());
    }
}

#[tokio::test]
async fn test_attached_order_cannot_join_a_second_estimate() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let slab = seed_tax_slab(&store).await;
    let order = seed_order(&store, &dealer.id, "ORD-1001", dec!(300)).await;
    let service = service(&store);

    service
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![order.id.clone()],
            tax_slab: slab.id.clone(),
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(300)),
            due_date: None,
        })
        .await
        .unwrap();

    let err = service
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![order.id.clone()],
            tax_slab: slab.id,
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(300)),
            due_date: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn test_remove_releases_orders_back_to_pending() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let slab = seed_tax_slab(&store).await;
    let order = seed_order(&store, &dealer.id, "ORD-1001", dec!(300)).await;
    let service = service(&store);

    let estimate = service
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![order.id.clone()],
            tax_slab: slab.id.clone(),
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(300)),
            due_date: None,
        })
        .await
        .unwrap();

    service.remove(&estimate.id).await.unwrap();

    let released = fetch_order(&store, &order.id).await;
    assert!(released.is_estimable());
    assert!(service.get(&estimate.id).await.is_err());

    // released orders are estimable again
    let again = service
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![order.id],
            tax_slab: slab.id,
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(300)),
            due_date: None,
        })
        .await
        .unwrap();
    assert_ne!(again.id, estimate.id);
}

#[tokio::test]
async fn test_daily_sequence_increments_within_the_day() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let slab = seed_tax_slab(&store).await;
    let first = seed_order(&store, &dealer.id, "ORD-1001", dec!(100)).await;
    let second = seed_order(&store, &dealer.id, "ORD-1002", dec!(100)).await;
    let service = service(&store);

    let a = service
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![first.id],
            tax_slab: slab.id.clone(),
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(100)),
            due_date: None,
        })
        .await
        .unwrap();
    let b = service
        .generate(GenerateEstimateRequest {
            dealer: dealer.id.clone(),
            order_ids: vec![second.id],
            tax_slab: slab.id,
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(100)),
            due_date: None,
        })
        .await
        .unwrap();

    assert!(a.estimate_number.ends_with("-001"));
    assert!(b.estimate_number.ends_with("-002"));
    assert_eq!(service.list_for_dealer(&dealer.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_tax_slab_is_not_found() {
    let store = store();
    let dealer = seed_dealer(&store).await;
    let order = seed_order(&store, &dealer.id, "ORD-1001", dec!(100)).await;

    let err = service(&store)
        .generate(GenerateEstimateRequest {
            dealer: dealer.id,
            order_ids: vec![order.id],
            tax_slab: "ghost".to_string(),
            kind: EstimateKind::Estimate,
            grand_total: Some(dec!(100)),
            due_date: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::NotFound { entity: "TaxSlab", .. }));
}
