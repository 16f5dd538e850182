//! Cart Models

use atelier::{
    money::{MoneyError, line_total},
    pricing,
};
use jiff::Timestamp;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::catalog::models::{ProductUuid, VariantUuid},
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<Cart>;

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItem>;

/// Cart Model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub uuid: CartUuid,
    #[serde(skip)]
    pub session_token: String,
    pub user_uuid: Option<Uuid>,
    pub items: Vec<CartItem>,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line totals at live prices.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the sum does not fit.
    pub fn subtotal(&self) -> Result<u64, MoneyError> {
        pricing::subtotal(
            self.items
                .iter()
                .map(|item| (item.unit_price, item.quantity)),
        )
    }
}

/// Cart Item Model
///
/// `unit_price` is resolved from the catalog each time the cart is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub uuid: CartItemUuid,
    pub product_uuid: ProductUuid,
    pub variant_uuid: Option<VariantUuid>,
    pub product_title: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub unit_price: u64,
    pub quantity: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartItem {
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the line total does not fit.
    pub fn line_total(&self) -> Result<u64, MoneyError> {
        line_total(self.unit_price, self.quantity)
    }
}

/// New Cart Item Model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_uuid: ProductUuid,
    pub variant_uuid: Option<VariantUuid>,
    pub quantity: u32,
}
