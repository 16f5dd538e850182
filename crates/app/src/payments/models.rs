//! Payment Gateway Models

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A line of the order being paid for, as shown to the buyer by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLineItem {
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: u64,
}

/// Request to open a payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePaymentIntent {
    /// Amount in minor units.
    pub amount: u64,
    pub currency: String,
    pub customer_ref: String,
    pub description: String,
    pub line_items: Vec<PaymentLineItem>,
    pub metadata: BTreeMap<String, String>,
    /// Repeating a request with the same key never opens a second intent.
    pub idempotency_key: String,
}

/// Request to refund a captured intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub intent_id: String,
    /// Minor units to refund; everything captured when `None`.
    pub amount: Option<u64>,
    /// Repeating a refund with the same key never pays out twice.
    pub idempotency_key: String,
}

/// Gateway-side state of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPayment,
    Processing,
    Succeeded,
    Canceled,
}

impl PaymentIntentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequiresPayment => "requires_payment",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentIntentStatus {
    type Err = String;

    /// Accepts the card processor's finer-grained states as well.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "requires_payment"
            | "requires_payment_method"
            | "requires_confirmation"
            | "requires_action"
            | "requires_capture" => Ok(Self::RequiresPayment),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            other => Err(other.to_string()),
        }
    }
}

/// An authorisation in progress at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    /// Opaque token the client uses to complete payment: a client secret or a redirect URL.
    pub client_secret: String,
    pub status: PaymentIntentStatus,
}

/// Outcome of a refund accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundResult {
    pub refund_id: String,
    pub intent_id: String,
    pub amount: u64,
    pub currency: String,
    pub status: String,
}
