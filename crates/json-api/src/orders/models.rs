//! Order response models.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::orders::models::{Order, OrderItem};

use crate::checkout::models::AddressBody;

/// Order Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderResponse {
    pub uuid: Uuid,

    pub order_number: String,

    pub customer_email: String,

    pub customer_name: String,

    pub payment_method: String,

    /// Gateway the payment intent was opened with
    pub payment_gateway: String,

    /// `pending`, `paid`, `failed` or `refunded`
    pub payment_status: String,

    pub payment_failure_reason: Option<String>,

    /// `unfulfilled`, `partially_fulfilled` or `fulfilled`
    pub fulfillment_status: String,

    pub payment_intent_id: Option<String>,

    pub subtotal: u64,

    pub tax: u64,

    pub discount: u64,

    pub total: u64,

    pub refunded_amount: u64,

    pub currency: String,

    pub discount_code: Option<String>,

    pub shipping_address: AddressBody,

    pub billing_address: AddressBody,

    pub notes: Option<String>,

    pub items: Vec<OrderItemResponse>,

    pub created_at: String,

    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            uuid: order.uuid.into_uuid(),
            order_number: order.order_number,
            customer_email: order.customer_email,
            customer_name: order.customer_name,
            payment_method: order.payment_method.to_string(),
            payment_gateway: order.payment_gateway,
            payment_status: order.payment_status.to_string(),
            payment_failure_reason: order.payment_failure_reason,
            fulfillment_status: order.fulfillment_status.to_string(),
            payment_intent_id: order.payment_intent_id,
            subtotal: order.subtotal,
            tax: order.tax,
            discount: order.discount,
            total: order.total,
            refunded_amount: order.refunded_amount,
            currency: order.currency,
            discount_code: order.discount_code,
            shipping_address: order.shipping_address.into(),
            billing_address: order.billing_address.into(),
            notes: order.notes,
            items: order.items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at.to_string(),
            updated_at: order.updated_at.to_string(),
        }
    }
}

/// Order Item Response
///
/// Prices are the snapshot taken at checkout.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderItemResponse {
    pub uuid: Uuid,

    pub product_uuid: Uuid,

    pub variant_uuid: Option<Uuid>,

    pub product_name: String,

    pub variant_name: Option<String>,

    pub sku: String,

    pub quantity: u32,

    pub unit_price: u64,

    pub total_price: u64,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            uuid: item.uuid.into_uuid(),
            product_uuid: item.product_uuid.into_uuid(),
            variant_uuid: item.variant_uuid.map(|variant| variant.into_uuid()),
            product_name: item.product_name,
            variant_name: item.variant_name,
            sku: item.sku,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        }
    }
}
