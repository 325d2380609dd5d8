// Estimate aggregation.
//
// Generation bundles a dealer's unattached orders under one total and due
// date; every bundled order is flipped to Estimated and linked back to the
// estimate in the same atomic unit. Deletion releases all of them or none.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::{BillingConfig, NumberingConfig};
use crate::core::money;
use crate::core::numbering::{format_daily_number, SequenceKind};
use crate::core::{LedgerError, Result};
use crate::modules::orders::models::OrderEstimateState;
use crate::store::LedgerStore;

use super::super::models::{Estimate, EstimateKind};

/// Input for generating an estimate.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateEstimateRequest {
    /// Billed dealer ID
    pub dealer: String,

    /// Orders to bundle; all must belong to the dealer and be unattached
    pub order_ids: Vec<String>,

    /// Referenced tax slab ID
    pub tax_slab: String,

    pub kind: EstimateKind,

    /// Caller-supplied total; required for estimate-kind documents,
    /// ignored otherwise (invoice-kind totals are summed from the orders)
    pub grand_total: Option<Decimal>,

    /// Explicit due date; defaults to today plus the dealer's payment terms
    pub due_date: Option<NaiveDate>,
}

/// Estimate aggregation service.
pub struct EstimateService {
    store: Arc<dyn LedgerStore>,
    numbering: NumberingConfig,
    billing: BillingConfig,
}

impl EstimateService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        numbering: NumberingConfig,
        billing: BillingConfig,
    ) -> Self {
        Self {
            store,
            numbering,
            billing,
        }
    }

    /// Bundle orders into an estimate, atomically.
    ///
    /// # Errors
    /// * `NotFound` - dealer or tax slab absent
    /// * `OrdersDoNotBelongToDealer` - an order is missing or owned elsewhere
    /// * `Validation` - an order is already attached, or an estimate-kind
    ///   request carries no grand total
    pub async fn generate(&self, request: GenerateEstimateRequest) -> Result<Estimate> {
        if request.order_ids.is_empty() {
            return Err(LedgerError::validation(
                "Estimate must reference at least one order",
            ));
        }

        let mut tx = self.store.begin().await?;

        let dealer = tx
            .get_dealer(&request.dealer)
            .await?
            .ok_or_else(|| LedgerError::not_found("Dealer", request.dealer.clone()))?;
        tx.get_tax_slab(&request.tax_slab)
            .await?
            .ok_or_else(|| LedgerError::not_found("TaxSlab", request.tax_slab.clone()))?;

        let orders = tx.get_orders_by_ids(&request.order_ids).await?;
        let matched = orders
            .iter()
            .filter(|order| order.dealer == dealer.id)
            .count();
        if matched != request.order_ids.len() {
            tracing::warn!(
                dealer = %dealer.id,
                requested = request.order_ids.len(),
                matched,
                "Estimate rejected: orders do not resolve to the dealer"
            );
            return Err(LedgerError::OrdersDoNotBelongToDealer {
                dealer: dealer.id,
                requested: request.order_ids.len(),
                matched,
            });
        }
        if let Some(taken) = orders.iter().find(|order| !order.is_estimable()) {
            return Err(LedgerError::validation(format!(
                "Order {} is already attached to another estimate",
                taken.order_number
            )));
        }

        let total_amount = match request.kind {
            EstimateKind::Estimate => {
                let total = request.grand_total.ok_or_else(|| {
                    LedgerError::validation("Estimate-kind documents require a grand total")
                })?;
                money::validate_positive("grand total", total)?;
                total
            }
            EstimateKind::Invoice => orders.iter().map(|order| order.grand_total).sum(),
        };

        let today = Utc::now().date_naive();
        let due_date = request.due_date.unwrap_or_else(|| {
            let days = if dealer.credit_due_days > 0 {
                dealer.credit_due_days
            } else {
                self.billing.default_credit_due_days
            };
            today + Duration::days(days as i64)
        });

        let prefix = match request.kind {
            EstimateKind::Estimate => &self.numbering.estimate_prefix,
            EstimateKind::Invoice => &self.numbering.estimate_invoice_prefix,
        };
        let sequence = tx
            .next_sequence(&SequenceKind::Estimate {
                prefix: prefix.clone(),
                day: today,
            })
            .await?;
        let estimate_number = format_daily_number(
            prefix,
            today,
            sequence,
            self.numbering.estimate_pad_width,
        );

        let estimate = Estimate::new(
            estimate_number,
            dealer.id,
            request.order_ids.clone(),
            request.tax_slab,
            total_amount,
            due_date,
            request.kind,
        )?;
        tx.insert_estimate(&estimate).await?;

        let mut linked = 0;
        for order_id in &request.order_ids {
            if tx
                .update_order_estimate_link(order_id, OrderEstimateState::Estimated, Some(&estimate.id))
                .await?
            {
                linked += 1;
            }
        }
        if linked != request.order_ids.len() {
            return Err(LedgerError::PartialOrderUpdateFailure {
                estimate: estimate.estimate_number,
                expected: request.order_ids.len(),
                updated: linked,
            });
        }

        tx.commit().await?;

        tracing::info!(
            estimate_number = %estimate.estimate_number,
            dealer = %estimate.dealer,
            total_amount = %estimate.total_amount,
            orders = estimate.orders.len(),
            "Estimate generated"
        );

        Ok(estimate)
    }

    /// Delete an estimate, releasing every linked order back to Pending.
    ///
    /// If any linked order cannot be released the whole deletion aborts
    /// with `PartialOrderUpdateFailure` and nothing changes.
    pub async fn remove(&self, estimate_id: &str) -> Result<()> {
        let mut tx = self.store.begin().await?;

        let estimate = tx
            .get_estimate(estimate_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Estimate", estimate_id))?;

        let mut released = 0;
        for order_id in &estimate.orders {
            if tx
                .update_order_estimate_link(order_id, OrderEstimateState::Pending, None)
                .await?
            {
                released += 1;
            }
        }
        if released != estimate.orders.len() {
            tracing::warn!(
                estimate_number = %estimate.estimate_number,
                expected = estimate.orders.len(),
                released,
                "Estimate deletion aborted: could not release every order"
            );
            return Err(LedgerError::PartialOrderUpdateFailure {
                estimate: estimate.estimate_number,
                expected: estimate.orders.len(),
                updated: released,
            });
        }

        tx.delete_estimate(estimate_id).await?;
        tx.commit().await?;

        tracing::info!(
            estimate_number = %estimate.estimate_number,
            dealer = %estimate.dealer,
            orders = estimate.orders.len(),
            "Estimate deleted, orders released"
        );

        Ok(())
    }

    /// Get an estimate by record ID.
    pub async fn get(&self, id: &str) -> Result<Estimate> {
        let mut tx = self.store.begin().await?;
        tx.get_estimate(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Estimate", id))
    }

    /// List a dealer's estimates by number.
    pub async fn list_for_dealer(&self, dealer: &str) -> Result<Vec<Estimate>> {
        let mut tx = self.store.begin().await?;
        tx.list_estimates_for_dealer(dealer).await
    }
}
