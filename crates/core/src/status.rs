//! Order status axes and the payment state machine.
//!
//! ```text
//! pending ──succeeded──▶ paid ──refunded──▶ refunded
//!    │
//!    └─────failed──────▶ failed
//! ```
//!
//! `failed` and `refunded` are terminal. Fulfillment moves independently of payment.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when parsing an unknown status name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {axis} status: {value}")]
pub struct UnknownStatus {
    axis: &'static str,
    value: String,
}

/// Payment axis of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting the provider's verdict; stock is reserved.
    Pending,

    /// Captured; stock stays reserved.
    Paid,

    /// Declined or abandoned; stock was released.
    Failed,

    /// Money returned; stock was released.
    Refunded,
}

/// An event that moves an order along the payment axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    /// The provider reported a successful payment.
    Succeeded,

    /// The provider reported a failed payment.
    Failed,

    /// A refund was issued.
    Refunded,
}

/// Outcome of applying a [`PaymentEvent`] to a [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to the given status.
    To(PaymentStatus),

    /// The order is already in the status this event leads to.
    AlreadyApplied,

    /// The event is not allowed from the current status.
    NotAllowed,
}

impl PaymentStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Whether no further payment events may change this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Refunded)
    }

    /// Whether orders in this status hold an inventory reservation.
    #[must_use]
    pub const fn holds_stock(self) -> bool {
        matches!(self, Self::Pending | Self::Paid)
    }

    /// Apply `event` to this status.
    #[must_use]
    pub const fn apply(self, event: PaymentEvent) -> Transition {
        match (self, event) {
            (Self::Pending, PaymentEvent::Succeeded) => Transition::To(Self::Paid),
            (Self::Pending, PaymentEvent::Failed) => Transition::To(Self::Failed),
            (Self::Paid, PaymentEvent::Refunded) => Transition::To(Self::Refunded),
            (Self::Paid, PaymentEvent::Succeeded)
            | (Self::Failed, PaymentEvent::Failed)
            | (Self::Refunded, PaymentEvent::Refunded) => Transition::AlreadyApplied,
            (Self::Paid, PaymentEvent::Failed)
            | (Self::Pending | Self::Failed, PaymentEvent::Refunded)
            | (Self::Failed | Self::Refunded, PaymentEvent::Succeeded)
            | (Self::Refunded, PaymentEvent::Failed) => Transition::NotAllowed,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(UnknownStatus {
                axis: "payment",
                value: other.to_owned(),
            }),
        }
    }
}

/// Fulfillment axis of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    /// Nothing shipped.
    Unfulfilled,

    /// Some lines shipped.
    PartiallyFulfilled,

    /// Everything shipped.
    Fulfilled,
}

impl FulfillmentStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unfulfilled => "unfulfilled",
            Self::PartiallyFulfilled => "partially_fulfilled",
            Self::Fulfilled => "fulfilled",
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unfulfilled" => Ok(Self::Unfulfilled),
            "partially_fulfilled" => Ok(Self::PartiallyFulfilled),
            "fulfilled" => Ok(Self::Fulfilled),
            other => Err(UnknownStatus {
                axis: "fulfillment",
                value: other.to_owned(),
            }),
        }
    }
}
