//! Gateway-agnostic payment amount validation.

use thiserror::Error;

/// Amount limits advertised by a payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountPolicy {
    /// Smallest chargeable amount in minor units.
    pub minimum: u64,

    /// Whether a zero amount may be charged at all.
    pub supports_zero: bool,
}

/// Why an amount cannot be charged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    /// Amounts are minor units and never below zero.
    #[error("amount cannot be negative: {0}")]
    Negative(i64),

    /// Zero was requested from a gateway that cannot charge nothing.
    #[error("zero amounts are not supported by this gateway")]
    ZeroNotSupported,

    /// A positive amount under the gateway's smallest chargeable amount.
    #[error("amount {amount} is below the gateway minimum of {minimum}")]
    BelowMinimum { amount: u64, minimum: u64 },
}

/// Validate `amount` (minor units) against `policy`.
///
/// A zero amount is accepted whenever the gateway supports zero, regardless of its minimum.
///
/// # Errors
///
/// Returns the [`AmountError`] describing the violated limit.
pub fn validate_amount(amount: i64, policy: AmountPolicy) -> Result<(), AmountError> {
    let Ok(amount) = u64::try_from(amount) else {
        return Err(AmountError::Negative(amount));
    };

    if amount == 0 {
        return if policy.supports_zero {
            Ok(())
        } else {
            Err(AmountError::ZeroNotSupported)
        };
    }

    if amount < policy.minimum {
        return Err(AmountError::BelowMinimum {
            amount,
            minimum: policy.minimum,
        });
    }

    Ok(())
}
