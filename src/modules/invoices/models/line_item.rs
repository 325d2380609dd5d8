// Invoice line item: a denormalized product/quantity/price snapshot.
//
// Line items are copied onto the invoice at generation time so later catalog
// edits can never change what a financial record says was billed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money;
use crate::core::{LedgerError, Result};

/// A single billed line on an invoice (or an order snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product name at billing time
    pub product: String,

    /// Child-product / variant snapshot, when the product has one
    pub variant: Option<String>,

    pub quantity: u32,

    /// Unit price at billing time
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn new(
        product: String,
        variant: Option<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<Self> {
        if product.trim().is_empty() {
            return Err(LedgerError::validation("Line item product cannot be empty"));
        }
        if quantity == 0 {
            return Err(LedgerError::validation(
                "Line item quantity must be greater than zero",
            ));
        }
        money::validate_positive("unit price", unit_price)?;

        Ok(Self {
            product,
            variant,
            quantity,
            unit_price,
        })
    }

    /// Line subtotal: quantity × unit price.
    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}
