use rust_decimal::Decimal;

use crate::core::error::{LedgerError, Result};

/// Decimal places the ledger currency supports (minor units).
pub const SCALE: u32 = 2;

/// True when `amount` fits the currency's minor-unit scale.
///
/// Trailing zeros do not count against the scale, so `10.500` passes while
/// `10.505` does not.
pub fn fits_minor_units(amount: Decimal) -> bool {
    amount.normalize().scale() <= SCALE
}

/// Validate an amount that may legitimately be zero (running balances,
/// adjustment results). Rejects negatives and sub-minor-unit precision.
///
/// Precision is rejected rather than rounded: no rounding rule is applied
/// anywhere in the ledger, so a capture can never create residue the payment
/// history cannot explain.
pub fn validate_amount(field: &str, amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "{} cannot be negative (got {})",
            field, amount
        )));
    }
    if !fits_minor_units(amount) {
        return Err(LedgerError::validation(format!(
            "{} must have at most {} decimal places (got {})",
            field, SCALE, amount
        )));
    }
    Ok(())
}

/// Validate an amount that must be strictly positive (memo grants, captures,
/// line-item prices).
pub fn validate_positive(field: &str, amount: Decimal) -> Result<()> {
    validate_amount(field, amount)?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "{} must be greater than zero (got {})",
            field, amount
        )));
    }
    Ok(())
}
