//! Errors

use salvo::http::StatusError;

use atelier_app::domain::{checkout::CheckoutError, orders::OrdersServiceError};

use crate::{carts, discounts, orders};

pub(crate) fn into_status_error(error: CheckoutError) -> StatusError {
    match error {
        CheckoutError::Cart(error) => carts::errors::into_status_error(error),
        CheckoutError::Discount(error) => discounts::errors::into_status_error(error),
        CheckoutError::Order(error) => orders::errors::into_status_error(error),
    }
}

/// Metric label for a checkout attempt's result.
pub(crate) fn outcome(result: Result<(), &CheckoutError>) -> &'static str {
    match result {
        Ok(()) => "placed",
        Err(CheckoutError::Cart(_)) => "cart_error",
        Err(
            CheckoutError::Discount(_)
            | CheckoutError::Order(OrdersServiceError::InvalidDiscount(_)),
        ) => "discount_rejected",
        Err(CheckoutError::Order(
            OrdersServiceError::PaymentFailed(_) | OrdersServiceError::PaymentValidationFailed(_),
        )) => "payment_failed",
        Err(CheckoutError::Order(OrdersServiceError::OutOfStock { .. })) => "out_of_stock",
        Err(CheckoutError::Order(_)) => "rejected",
    }
}
