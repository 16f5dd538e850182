//! Orders service errors.

use atelier::{discounts::DiscountRejection, money::MoneyError};
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::{
    domain::{
        catalog::models::VariantUuid, inventory::InventoryError,
        orders::models::CheckoutRequestError,
    },
    payments::PaymentGatewayError,
};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error(transparent)]
    InvalidRequest(#[from] CheckoutRequestError),

    #[error("cart is empty")]
    EmptyCart,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("insufficient stock for variant {variant}: requested {requested}")]
    OutOfStock { variant: VariantUuid, requested: u32 },

    #[error("product or variant not found")]
    ProductNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("order already exists")]
    AlreadyExists,

    #[error("discount code cannot be applied: {0}")]
    InvalidDiscount(#[from] DiscountRejection),

    #[error("payment amount rejected")]
    PaymentValidationFailed(#[source] PaymentGatewayError),

    #[error("payment failed")]
    PaymentFailed(#[source] PaymentGatewayError),

    #[error("checkout was interrupted")]
    Interrupted,

    #[error("invalid data")]
    InvalidData,

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl OrdersServiceError {
    /// Sort a gateway failure into the validation or provider bucket.
    #[must_use]
    pub fn from_gateway(error: PaymentGatewayError) -> Self {
        if error.is_validation() {
            Self::PaymentValidationFailed(error)
        } else {
            Self::PaymentFailed(error)
        }
    }
}

impl From<Error> for OrdersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::OrderNotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::ProductNotFound,
            Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

impl From<InventoryError> for OrdersServiceError {
    fn from(error: InventoryError) -> Self {
        match error {
            InventoryError::OutOfStock { variant, requested } => {
                Self::OutOfStock { variant, requested }
            }
            InventoryError::VariantNotFound => Self::ProductNotFound,
            InventoryError::InvalidQuantity => Self::InvalidQuantity,
            InventoryError::NegativeStock => Self::InvalidData,
            InventoryError::Sql(source) => Self::Sql(source),
        }
    }
}
