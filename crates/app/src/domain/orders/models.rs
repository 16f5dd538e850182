//! Order Models

use std::{fmt, str::FromStr};

use atelier::{
    pricing::Totals,
    status::{FulfillmentStatus, PaymentStatus},
};
use jiff::Timestamp;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::catalog::models::{ProductUuid, VariantUuid},
    payments::PaymentIntent,
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<Order>;

/// Order Item UUID
pub type OrderItemUuid = TypedUuid<OrderItem>;

/// Default page size for order listings.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size for order listings.
pub const MAX_PER_PAGE: u32 = 100;

const ORDER_NUMBER_SUFFIX_LEN: usize = 6;

// no 0/O or 1/I
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// How the buyer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    Stripe,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::Paypal => "paypal",
            Self::Stripe => "stripe",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "credit_card" => Ok(Self::CreditCard),
            "paypal" => Ok(Self::Paypal),
            "stripe" => Ok(Self::Stripe),
            other => Err(UnknownPaymentMethod(other.to_owned())),
        }
    }
}

/// Postal address, stored as JSON on the order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// The first required field that is blank, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("street", &self.street),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .find_map(|(name, value)| value.trim().is_empty().then_some(name))
    }
}

/// Buyer details collected at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    pub name: String,
    pub payment_method: PaymentMethod,
    pub shipping_address: Address,
    /// Defaults to the shipping address.
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Why a checkout request was refused before touching any state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutRequestError {
    #[error("email is required")]
    MissingEmail,

    #[error("email is not valid")]
    InvalidEmail,

    #[error("name is required")]
    MissingName,

    #[error("shipping address {0} is required")]
    IncompleteShippingAddress(&'static str),

    #[error("billing address {0} is required")]
    IncompleteBillingAddress(&'static str),
}

impl CheckoutRequest {
    /// # Errors
    ///
    /// Returns the first [`CheckoutRequestError`] found.
    pub fn validate(&self) -> Result<(), CheckoutRequestError> {
        let email = self.email.trim();

        if email.is_empty() {
            return Err(CheckoutRequestError::MissingEmail);
        }

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(CheckoutRequestError::InvalidEmail),
        }

        if self.name.trim().is_empty() {
            return Err(CheckoutRequestError::MissingName);
        }

        if let Some(field) = self.shipping_address.missing_field() {
            return Err(CheckoutRequestError::IncompleteShippingAddress(field));
        }

        if let Some(field) = self
            .billing_address
            .as_ref()
            .and_then(Address::missing_field)
        {
            return Err(CheckoutRequestError::IncompleteBillingAddress(field));
        }

        Ok(())
    }

    #[must_use]
    pub fn billing_address(&self) -> &Address {
        self.billing_address
            .as_ref()
            .unwrap_or(&self.shipping_address)
    }
}

/// Order Model
///
/// Prices are a snapshot taken when the order was placed and are never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub uuid: OrderUuid,
    pub order_number: String,
    pub customer_email: String,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub payment_gateway: String,
    pub payment_status: PaymentStatus,
    pub payment_failure_reason: Option<String>,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_intent_id: Option<String>,
    pub subtotal: u64,
    pub tax: u64,
    pub discount: u64,
    pub total: u64,
    pub refunded_amount: u64,
    pub currency: String,
    pub discount_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    #[must_use]
    pub const fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            tax: self.tax,
            discount: self.discount,
            total: self.total,
        }
    }
}

/// Order Item Model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub uuid: OrderItemUuid,
    pub position: u32,
    pub product_uuid: ProductUuid,
    pub variant_uuid: Option<VariantUuid>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub total_price: u64,
}

/// Snapshot of a cart line taken inside the checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewOrderItem {
    pub uuid: OrderItemUuid,
    pub position: u32,
    pub product_uuid: ProductUuid,
    pub variant_uuid: Option<VariantUuid>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub total_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewOrder {
    pub uuid: OrderUuid,
    pub order_number: String,
    pub customer_email: String,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub payment_gateway: String,
    pub totals: Totals,
    pub currency: String,
    pub discount_code: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub notes: Option<String>,
}

/// A committed order and the intent the buyer completes payment with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub intent: PaymentIntent,
}

/// Filters for the admin order listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct OrderFilter {
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub customer_email: Option<String>,
    pub created_from: Option<Timestamp>,
    pub created_to: Option<Timestamp>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderFilter {
    /// Page number, starting at 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.per_page())
    }
}

/// One page of orders plus the number of orders matching the filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Human-readable order number such as `ORD-20260301-101500-K7QX2M`.
#[must_use]
pub fn generate_order_number(now: Timestamp) -> String {
    let mut rng = rand::thread_rng();

    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| {
            let index = rng.gen_range(0..ORDER_NUMBER_ALPHABET.len());
            char::from(ORDER_NUMBER_ALPHABET[index])
        })
        .collect();

    format!("ORD-{}-{suffix}", now.strftime("%Y%m%d-%H%M%S"))
}
