//! Payment gateway errors.

use atelier::payments::AmountError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentGatewayError {
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error("payment intent {0} not found")]
    IntentNotFound(String),

    #[error("payment declined: {0}")]
    Declined(String),

    #[error("manual action required: {0}")]
    ManualActionRequired(String),

    #[error("webhook signature could not be verified: {0}")]
    InvalidSignature(&'static str),

    #[error("gateway request failed")]
    Http(#[from] reqwest::Error),

    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    #[error("gateway did not answer in time")]
    Timeout,

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

impl PaymentGatewayError {
    /// Whether the gateway refused the amount before contacting the provider.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidAmount(_))
    }
}
