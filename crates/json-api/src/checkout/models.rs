//! Checkout request and response models.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::orders::models::{Address, CheckoutRequest, PaymentMethod, PlacedOrder};

/// Postal Address
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub(crate) struct AddressBody {
    pub street: String,

    pub city: String,

    /// State or region, where the country uses one
    #[serde(default)]
    pub state: String,

    pub postal_code: String,

    /// ISO 3166-1 alpha-2 country code
    pub country: String,
}

impl From<AddressBody> for Address {
    fn from(body: AddressBody) -> Self {
        Address {
            street: body.street,
            city: body.city,
            state: body.state,
            postal_code: body.postal_code,
            country: body.country,
        }
    }
}

impl From<Address> for AddressBody {
    fn from(address: Address) -> Self {
        AddressBody {
            street: address.street,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
            country: address.country,
        }
    }
}

/// Checkout Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CheckoutBody {
    pub email: String,

    pub name: String,

    /// `credit_card`, `paypal` or `stripe`
    pub payment_method: String,

    pub shipping_address: AddressBody,

    /// Defaults to the shipping address
    #[serde(default)]
    pub billing_address: Option<AddressBody>,

    #[serde(default)]
    pub notes: Option<String>,

    /// Discount code to redeem with this order
    #[serde(default)]
    pub discount_code: Option<String>,

    /// Cart session token, for clients that cannot send the session cookie or header
    #[serde(default)]
    pub session_token: Option<String>,
}

impl CheckoutBody {
    /// Split the body into the buyer details, the discount code and the session token.
    pub(crate) fn into_parts(
        self,
        payment_method: PaymentMethod,
    ) -> (CheckoutRequest, Option<String>, Option<String>) {
        let request = CheckoutRequest {
            email: self.email,
            name: self.name,
            payment_method,
            shipping_address: self.shipping_address.into(),
            billing_address: self.billing_address.map(Address::from),
            notes: self.notes.filter(|notes| !notes.trim().is_empty()),
        };

        let code = self
            .discount_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());

        (request, code, self.session_token)
    }
}

/// Order Placed Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderPlacedResponse {
    pub order_uuid: Uuid,

    /// Human-readable order number, e.g. `ORD-20260301-101500-K7QX2M`
    pub order_number: String,

    pub payment_intent_id: String,

    /// Token the client hands to the payment provider to complete payment
    pub client_secret: String,

    pub subtotal: u64,

    pub tax: u64,

    pub discount: u64,

    /// Amount the intent was opened for, in minor units
    pub total: u64,

    pub currency: String,

    /// Always `pending` until the provider reports back
    pub payment_status: String,
}

impl From<PlacedOrder> for OrderPlacedResponse {
    fn from(placed: PlacedOrder) -> Self {
        let PlacedOrder { order, intent } = placed;

        Self {
            order_uuid: order.uuid.into_uuid(),
            order_number: order.order_number,
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            subtotal: order.subtotal,
            tax: order.tax,
            discount: order.discount,
            total: order.total,
            currency: order.currency,
            payment_status: order.payment_status.to_string(),
        }
    }
}
