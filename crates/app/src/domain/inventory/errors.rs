//! Inventory errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::catalog::models::VariantUuid;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("insufficient stock for variant {variant}: requested {requested}")]
    OutOfStock { variant: VariantUuid, requested: u32 },

    #[error("variant not found")]
    VariantNotFound,

    #[error("stock cannot go below zero")]
    NegativeStock,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for InventoryError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::VariantNotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::CheckViolation) => Self::NegativeStock,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
