//! Discount codes
//!
//! A discount code is either a percentage of the subtotal (stored in basis points) or a fixed
//! amount in minor units. Codes are only redeemable while active, inside their validity window
//! and below their usage cap.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::{self, BASIS_POINTS_PER_WHOLE, MoneyError};

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is basis points of the subtotal.
    Percentage,

    /// `value` is a fixed amount in minor units.
    FixedAmount,
}

impl DiscountKind {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when parsing an unknown discount kind.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown discount kind: {0}")]
pub struct UnknownDiscountKind(pub String);

impl FromStr for DiscountKind {
    type Err = UnknownDiscountKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "percentage" => Ok(Self::Percentage),
            "fixed_amount" => Ok(Self::FixedAmount),
            other => Err(UnknownDiscountKind(other.to_owned())),
        }
    }
}

/// Why a discount code cannot be applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountRejection {
    /// The code has been switched off.
    #[error("discount code is inactive")]
    Inactive,

    /// The validity window has not opened yet.
    #[error("discount code is not active yet")]
    NotStarted,

    /// The validity window has closed.
    #[error("discount code has expired")]
    Expired,

    /// The usage cap has been reached.
    #[error("discount code usage limit reached")]
    UsageExhausted,

    /// The subtotal is below the code's minimum purchase.
    #[error("subtotal {subtotal} is below the minimum purchase of {minimum}")]
    BelowMinimumPurchase {
        /// Subtotal the code was priced against.
        subtotal: u64,
        /// Required minimum subtotal.
        minimum: u64,
    },

    /// A percentage above 100% or a zero value.
    #[error("invalid discount value {value} for {kind}")]
    InvalidValue {
        /// Kind of the rejected value.
        kind: DiscountKind,
        /// Rejected value.
        value: u64,
    },

    /// Arithmetic overflow while pricing the discount.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// The pricing-relevant fields of a discount code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountRule {
    pub kind: DiscountKind,

    /// Basis points for percentage codes, minor units for fixed amounts.
    pub value: u64,

    /// Smallest subtotal, in minor units, the code applies to.
    pub min_purchase: u64,

    /// Redemption cap; unlimited when `None`.
    pub max_uses: Option<u64>,

    /// Redemptions recorded so far.
    pub used_count: u64,

    /// Not valid before this instant.
    pub starts_at: Option<Timestamp>,

    /// Not valid after this instant.
    pub expires_at: Option<Timestamp>,

    /// Deactivated codes never apply.
    pub active: bool,
}

impl DiscountRule {
    /// Reject values that can never price sensibly.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountRejection::InvalidValue`] for zero values or percentages above 100%.
    pub fn validate_value(kind: DiscountKind, value: u64) -> Result<(), DiscountRejection> {
        let in_range = match kind {
            DiscountKind::Percentage => (1..=u64::from(BASIS_POINTS_PER_WHOLE)).contains(&value),
            DiscountKind::FixedAmount => value > 0,
        };

        if in_range {
            Ok(())
        } else {
            Err(DiscountRejection::InvalidValue { kind, value })
        }
    }

    /// Check the active flag, validity window and usage cap at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first reason the code is not redeemable.
    pub fn check_redeemable(&self, now: Timestamp) -> Result<(), DiscountRejection> {
        if !self.active {
            return Err(DiscountRejection::Inactive);
        }

        if self.starts_at.is_some_and(|starts_at| now < starts_at) {
            return Err(DiscountRejection::NotStarted);
        }

        if self.expires_at.is_some_and(|expires_at| now > expires_at) {
            return Err(DiscountRejection::Expired);
        }

        if self
            .max_uses
            .is_some_and(|max_uses| self.used_count >= max_uses)
        {
            return Err(DiscountRejection::UsageExhausted);
        }

        Ok(())
    }

    /// Whether the code is redeemable at `now`, ignoring the minimum purchase.
    #[must_use]
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.check_redeemable(now).is_ok()
    }

    /// Discount in minor units for `subtotal`, capped at the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountRejection`] when the code is not redeemable or the subtotal is below
    /// the minimum purchase.
    pub fn amount_for(&self, subtotal: u64, now: Timestamp) -> Result<u64, DiscountRejection> {
        self.check_redeemable(now)?;

        if subtotal < self.min_purchase {
            return Err(DiscountRejection::BelowMinimumPurchase {
                subtotal,
                minimum: self.min_purchase,
            });
        }

        let amount = match self.kind {
            DiscountKind::Percentage => {
                let basis_points = u32::try_from(self.value).map_err(|_overflow| {
                    DiscountRejection::InvalidValue {
                        kind: self.kind,
                        value: self.value,
                    }
                })?;

                money::basis_points_of(subtotal, basis_points)?
            }
            DiscountKind::FixedAmount => self.value,
        };

        Ok(amount.min(subtotal))
    }
}
