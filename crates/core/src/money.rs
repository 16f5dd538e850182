//! Money

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso};
use thiserror::Error;

/// Basis points in one whole (100%).
pub const BASIS_POINTS_PER_WHOLE: u32 = 10_000;

/// Errors raised by minor-unit arithmetic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// The currency code is not an ISO 4217 code known to `rusty-money`.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// An amount did not fit in the target integer type.
    #[error("amount overflowed")]
    Overflow,
}

/// Look up an ISO currency by its code.
///
/// # Errors
///
/// Returns [`MoneyError::UnknownCurrency`] when the code is not recognised.
pub fn currency(code: &str) -> Result<&'static iso::Currency, MoneyError> {
    iso::find(code).ok_or_else(|| MoneyError::UnknownCurrency(code.to_owned()))
}

/// Render a minor-unit amount with its currency symbol, e.g. `€90,00`.
///
/// # Errors
///
/// Returns an error for unknown currencies or amounts beyond `i64::MAX`.
pub fn format_minor(amount: u64, code: &str) -> Result<String, MoneyError> {
    let currency = currency(code)?;
    let amount = i64::try_from(amount).map_err(|_overflow| MoneyError::Overflow)?;

    Ok(Money::from_minor(amount, currency).to_string())
}

/// Unit price multiplied by quantity.
///
/// # Errors
///
/// Returns [`MoneyError::Overflow`] if the product does not fit in a `u64`.
pub fn line_total(unit_price: u64, quantity: u32) -> Result<u64, MoneyError> {
    unit_price
        .checked_mul(u64::from(quantity))
        .ok_or(MoneyError::Overflow)
}

/// Take `basis_points` / 10 000 of `amount`, rounding half away from zero.
///
/// # Errors
///
/// Returns [`MoneyError::Overflow`] when the result cannot be represented.
pub fn basis_points_of(amount: u64, basis_points: u32) -> Result<u64, MoneyError> {
    Decimal::from(amount)
        .checked_mul(Decimal::new(i64::from(basis_points), 4))
        .ok_or(MoneyError::Overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(MoneyError::Overflow)
}
