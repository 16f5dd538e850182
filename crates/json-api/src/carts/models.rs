//! Cart response models.

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::carts::{
    CartsService, CartsServiceError,
    models::{Cart, CartItem},
};

use crate::carts::errors::into_status_error;

/// Cart Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartResponse {
    /// The unique identifier of the cart
    pub uuid: Uuid,

    /// The lines in the cart, priced at live catalog prices
    pub items: Vec<CartItemResponse>,

    /// Sum of line totals, in minor units
    pub subtotal: u64,

    /// Tax on the subtotal, in minor units
    pub tax: u64,

    /// Always zero; discount codes are applied at checkout
    pub discount: u64,

    /// Amount due, in minor units
    pub total: u64,

    /// ISO 4217 currency code
    pub currency: String,

    /// When the cart will be swept if left untouched
    pub expires_at: String,
}

/// Cart Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartItemResponse {
    /// The unique identifier of the cart line
    pub uuid: Uuid,

    pub product_uuid: Uuid,

    pub variant_uuid: Option<Uuid>,

    pub product_title: String,

    pub variant_name: Option<String>,

    pub sku: String,

    /// Live unit price, in minor units
    pub unit_price: u64,

    pub quantity: u32,

    /// `unit_price * quantity`, in minor units
    pub line_total: u64,
}

impl TryFrom<CartItem> for CartItemResponse {
    type Error = CartsServiceError;

    fn try_from(item: CartItem) -> Result<Self, Self::Error> {
        Ok(Self {
            line_total: item.line_total()?,
            uuid: item.uuid.into_uuid(),
            product_uuid: item.product_uuid.into_uuid(),
            variant_uuid: item.variant_uuid.map(|variant| variant.into_uuid()),
            product_title: item.product_title,
            variant_name: item.variant_name,
            sku: item.sku,
            unit_price: item.unit_price,
            quantity: item.quantity,
        })
    }
}

impl CartResponse {
    /// Price `cart` through the carts service and shape it for the client.
    pub(crate) fn priced(carts: &dyn CartsService, cart: Cart) -> Result<Self, StatusError> {
        let totals = carts.calculate_total(&cart).map_err(into_status_error)?;

        let items = cart
            .items
            .into_iter()
            .map(CartItemResponse::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(into_status_error)?;

        Ok(Self {
            uuid: cart.uuid.into_uuid(),
            items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            currency: carts.currency(),
            expires_at: cart.expires_at.to_string(),
        })
    }
}
