//! Checkout errors.

use thiserror::Error;

use crate::domain::{
    carts::CartsServiceError, discounts::DiscountsServiceError, orders::OrdersServiceError,
};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Cart(#[from] CartsServiceError),

    #[error(transparent)]
    Discount(#[from] DiscountsServiceError),

    #[error(transparent)]
    Order(#[from] OrdersServiceError),
}
