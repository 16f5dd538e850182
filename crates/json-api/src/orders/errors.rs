//! Errors

use salvo::http::StatusError;
use tracing::{error, warn};

use atelier_app::{
    domain::{orders::OrdersServiceError, reconciler::ReconcilerError},
    payments::PaymentGatewayError,
};

pub(crate) fn into_status_error(error: OrdersServiceError) -> StatusError {
    match error {
        OrdersServiceError::InvalidRequest(reason) => {
            StatusError::bad_request().brief(reason.to_string())
        }
        OrdersServiceError::EmptyCart => StatusError::bad_request().brief("Cart is empty"),
        OrdersServiceError::InvalidQuantity => {
            StatusError::bad_request().brief("Quantity must be at least 1")
        }
        OrdersServiceError::OutOfStock { .. } => StatusError::conflict().brief(error.to_string()),
        OrdersServiceError::ProductNotFound => {
            StatusError::not_found().brief("Product or variant not found")
        }
        OrdersServiceError::OrderNotFound => StatusError::not_found().brief("Order not found"),
        OrdersServiceError::AlreadyExists => {
            StatusError::conflict().brief("Order already exists")
        }
        OrdersServiceError::InvalidDiscount(rejection) => StatusError::unprocessable_entity()
            .brief(format!("Discount code cannot be applied: {rejection}")),
        OrdersServiceError::PaymentValidationFailed(source) => {
            warn!("payment amount rejected by gateway: {source}");

            StatusError::unprocessable_entity().brief("Payment amount rejected")
        }
        OrdersServiceError::PaymentFailed(source) => {
            warn!("payment gateway failed: {source}");

            StatusError::bad_gateway().brief("Payment could not be started")
        }
        OrdersServiceError::Interrupted => {
            StatusError::service_unavailable().brief("Checkout was interrupted, try again")
        }
        OrdersServiceError::InvalidData => StatusError::bad_request().brief("Invalid order data"),
        OrdersServiceError::Money(source) => {
            error!("failed to price order: {source}");

            StatusError::unprocessable_entity().brief("Order total cannot be represented")
        }
        OrdersServiceError::Sql(source) => {
            error!("order storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}

pub(crate) fn refund_status_error(error: ReconcilerError) -> StatusError {
    match error {
        ReconcilerError::OrderNotFound => StatusError::not_found().brief("Order not found"),
        ReconcilerError::NotRefundable(_) => StatusError::conflict().brief(error.to_string()),
        ReconcilerError::InvalidRefundAmount => {
            StatusError::bad_request().brief(error.to_string())
        }
        ReconcilerError::RefundFailed(PaymentGatewayError::ManualActionRequired(reason)) => {
            warn!("refund needs manual processing: {reason}");

            StatusError::unprocessable_entity()
                .brief("Refund must be processed manually with the payment provider")
                .detail(reason)
        }
        ReconcilerError::RefundFailed(source) => {
            warn!("refund rejected by gateway: {source}");

            StatusError::bad_gateway().brief("Refund failed; the order is still paid")
        }
        ReconcilerError::InvalidSignature(_)
        | ReconcilerError::MalformedPayload(_)
        | ReconcilerError::Inventory(_)
        | ReconcilerError::Sql(_) => {
            error!("refund failed: {error}");

            StatusError::internal_server_error()
        }
    }
}
