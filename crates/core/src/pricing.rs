//! Order and cart totals.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::money::{self, MoneyError};

/// Computes tax owed on an already-discounted amount.
pub trait TaxPolicy: Debug + Send + Sync {
    /// Tax in minor units for `taxable` minor units of `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error when the tax cannot be represented.
    fn tax_for(&self, taxable: u64, currency: &str) -> Result<u64, MoneyError>;
}

/// Charges no tax.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

impl TaxPolicy for NoTax {
    fn tax_for(&self, _taxable: u64, _currency: &str) -> Result<u64, MoneyError> {
        Ok(0)
    }
}

/// Charges a single rate, expressed in basis points, on every order.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateTax {
    basis_points: u32,
}

impl FlatRateTax {
    /// Create a flat rate; `2_000` is 20%.
    #[must_use]
    pub const fn new(basis_points: u32) -> Self {
        Self { basis_points }
    }
}

impl TaxPolicy for FlatRateTax {
    fn tax_for(&self, taxable: u64, _currency: &str) -> Result<u64, MoneyError> {
        money::basis_points_of(taxable, self.basis_points)
    }
}

/// Subtotal, tax, discount and total of a cart or order, in minor units.
///
/// `total == subtotal + tax - discount` always holds and the discount never
/// exceeds the subtotal, so the total is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line totals.
    pub subtotal: u64,

    /// Tax charged on the discounted subtotal.
    pub tax: u64,

    /// Discount applied, capped at the subtotal.
    pub discount: u64,

    /// Amount payable.
    pub total: u64,
}

impl Totals {
    /// Compute totals from a subtotal and a requested discount.
    ///
    /// # Errors
    ///
    /// Returns an error if the tax policy fails or the total overflows.
    pub fn compute(
        subtotal: u64,
        discount: u64,
        tax_policy: &dyn TaxPolicy,
        currency: &str,
    ) -> Result<Self, MoneyError> {
        let discount = discount.min(subtotal);
        let taxable = subtotal - discount;
        let tax = tax_policy.tax_for(taxable, currency)?;
        let total = taxable.checked_add(tax).ok_or(MoneyError::Overflow)?;

        Ok(Self {
            subtotal,
            tax,
            discount,
            total,
        })
    }
}

/// Sum `(unit_price, quantity)` pairs.
///
/// # Errors
///
/// Returns [`MoneyError::Overflow`] if any line or the sum overflows.
pub fn subtotal<I>(lines: I) -> Result<u64, MoneyError>
where
    I: IntoIterator<Item = (u64, u32)>,
{
    lines.into_iter().try_fold(0_u64, |acc, (unit_price, quantity)| {
        acc.checked_add(money::line_total(unit_price, quantity)?)
            .ok_or(MoneyError::Overflow)
    })
}
