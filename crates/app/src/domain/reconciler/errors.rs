//! Reconciler errors.

use atelier::status::PaymentStatus;
use sqlx::Error;
use thiserror::Error;

use crate::{domain::inventory::InventoryError, payments::PaymentGatewayError};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("order not found")]
    OrderNotFound,

    #[error("order is {0}; only paid orders can be refunded")]
    NotRefundable(PaymentStatus),

    #[error("refund amount must be between 1 and the order total")]
    InvalidRefundAmount,

    #[error("refund failed")]
    RefundFailed(#[source] PaymentGatewayError),

    #[error("webhook signature rejected")]
    InvalidSignature(#[source] PaymentGatewayError),

    #[error("malformed webhook payload")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("stock could not be released")]
    Inventory(#[from] InventoryError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for ReconcilerError {
    fn from(error: Error) -> Self {
        match error {
            Error::RowNotFound => Self::OrderNotFound,
            other => Self::Sql(other),
        }
    }
}
