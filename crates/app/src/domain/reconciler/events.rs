//! Webhook Events

use atelier::status::PaymentStatus;
use serde::Deserialize;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// A provider event as delivered to the webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventObject {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LastPaymentError {
    #[serde(default)]
    pub message: Option<String>,
}

/// What an event asks the reconciler to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction<'a> {
    Succeeded { intent_id: &'a str },
    Failed { intent_id: &'a str, reason: String },
    Ignored,
}

impl WebhookEvent {
    /// Parse a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not a provider event.
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    #[must_use]
    pub fn intent_id(&self) -> &str {
        &self.data.object.id
    }

    /// Key under which a delivery is remembered. Falls back to type and intent when the provider
    /// sends no event id.
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        if self.id.is_empty() {
            format!("{}:{}", self.event_type, self.intent_id())
        } else {
            self.id.clone()
        }
    }

    #[must_use]
    pub fn action(&self) -> WebhookAction<'_> {
        match self.event_type.as_str() {
            PAYMENT_SUCCEEDED => WebhookAction::Succeeded {
                intent_id: self.intent_id(),
            },
            PAYMENT_FAILED => WebhookAction::Failed {
                intent_id: self.intent_id(),
                reason: self.failure_reason(),
            },
            _ => WebhookAction::Ignored,
        }
    }

    fn failure_reason(&self) -> String {
        let object = &self.data.object;

        object
            .last_payment_error
            .as_ref()
            .and_then(|error| error.message.clone())
            .or_else(|| object.status.clone())
            .unwrap_or_else(|| "payment failed".to_string())
    }
}

/// Result of handling one event, reported back to the provider as a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order moved to the given status.
    Applied(PaymentStatus),

    /// The order was already in the status the event leads to.
    AlreadyApplied,

    /// This delivery was handled before.
    Duplicate,

    /// The event does not fit the order's current status.
    NotAllowed,

    /// No order carries the event's intent id.
    UnknownIntent,

    /// The event type is not one the store acts on.
    Ignored,
}

impl ReconcileOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied(PaymentStatus::Paid) => "paid",
            Self::Applied(PaymentStatus::Failed) => "failed",
            Self::Applied(PaymentStatus::Refunded) => "refunded",
            Self::Applied(PaymentStatus::Pending) => "pending",
            Self::AlreadyApplied => "already_applied",
            Self::Duplicate => "duplicate",
            Self::NotAllowed => "not_allowed",
            Self::UnknownIntent => "unknown_intent",
            Self::Ignored => "ignored",
        }
    }
}
