//! Notification Events

use atelier::money::format_minor;
use serde::Serialize;

use crate::domain::{catalog::models::VariantUuid, orders::models::OrderUuid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Something downstream systems may want to hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    OrderCreated {
        order_uuid: OrderUuid,
        order_number: String,
        total: u64,
        currency: String,
    },
    OrderPaid {
        order_uuid: OrderUuid,
        order_number: String,
        total: u64,
        currency: String,
    },
    /// `order_uuid` is `None` when checkout rolled back before the order was committed.
    PaymentFailed {
        order_uuid: Option<OrderUuid>,
        order_number: String,
        reason: String,
    },
    OrderRefunded {
        order_uuid: OrderUuid,
        order_number: String,
        amount: u64,
        currency: String,
    },
    LowStock {
        variant_uuid: VariantUuid,
        sku: String,
        stock: u32,
    },
}

impl NotificationEvent {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderPaid { .. } => "order_paid",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::OrderRefunded { .. } => "order_refunded",
            Self::LowStock { .. } => "low_stock",
        }
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::OrderCreated { .. } | Self::OrderPaid { .. } | Self::OrderRefunded { .. } => {
                Severity::Info
            }
            Self::LowStock { .. } => Severity::Warning,
            Self::PaymentFailed { .. } => Severity::Error,
        }
    }

    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::OrderCreated { order_number, .. } => format!("New order {order_number}"),
            Self::OrderPaid { order_number, .. } => format!("Order {order_number} paid"),
            Self::PaymentFailed { order_number, .. } => {
                format!("Payment failed for {order_number}")
            }
            Self::OrderRefunded { order_number, .. } => format!("Order {order_number} refunded"),
            Self::LowStock { sku, .. } => format!("Low stock: {sku}"),
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::OrderCreated {
                order_number,
                total,
                currency,
                ..
            } => format!(
                "Order {order_number} was placed for {}.",
                amount(*total, currency)
            ),
            Self::OrderPaid {
                order_number,
                total,
                currency,
                ..
            } => format!(
                "Payment of {} received for order {order_number}.",
                amount(*total, currency)
            ),
            Self::PaymentFailed {
                order_number,
                reason,
                ..
            } => format!("Payment for order {order_number} failed: {reason}"),
            Self::OrderRefunded {
                order_number,
                amount: refunded,
                currency,
                ..
            } => format!(
                "Refunded {} on order {order_number}.",
                amount(*refunded, currency)
            ),
            Self::LowStock { sku, stock, .. } => format!("{sku} has {stock} left in stock."),
        }
    }
}

fn amount(minor: u64, currency: &str) -> String {
    format_minor(minor, currency).unwrap_or_else(|_| format!("{minor} {currency}"))
}
