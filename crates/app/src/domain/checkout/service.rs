//! Checkout service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;

use crate::domain::{
    carts::{CartsService, CartsServiceError},
    checkout::errors::CheckoutError,
    discounts::{DiscountsService, DiscountsServiceError, models::DiscountPreview},
    orders::{
        OrdersService,
        models::{CheckoutRequest, PlacedOrder},
    },
};

#[derive(Clone)]
pub struct PgCheckoutService {
    carts: Arc<dyn CartsService>,
    discounts: Arc<dyn DiscountsService>,
    orders: Arc<dyn OrdersService>,
}

impl PgCheckoutService {
    #[must_use]
    pub fn new(
        carts: Arc<dyn CartsService>,
        discounts: Arc<dyn DiscountsService>,
        orders: Arc<dyn OrdersService>,
    ) -> Self {
        Self {
            carts,
            discounts,
            orders,
        }
    }
}

#[async_trait]
impl CheckoutService for PgCheckoutService {
    #[tracing::instrument(
        name = "checkout.service.checkout",
        skip(self, session_token, request, discount_code),
        fields(discount_code = discount_code.as_deref().unwrap_or_default()),
        err
    )]
    async fn checkout(
        &self,
        session_token: &str,
        request: CheckoutRequest,
        discount_code: Option<String>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let cart = self.carts.get_cart(session_token).await?;

        let discount = match discount_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let discount = self.discounts.find_by_code(code).await?;

                discount
                    .rule
                    .check_redeemable(Timestamp::now())
                    .map_err(DiscountsServiceError::from)?;

                Some(discount)
            }
            _ => None,
        };

        let placed = self.orders.create_order(cart, request, discount).await?;

        if let Err(error) = self.carts.clear_cart(session_token).await {
            tracing::warn!(
                order_uuid = %placed.order.uuid,
                %error,
                "order placed but cart could not be cleared"
            );
        }

        Ok(placed)
    }

    async fn preview_discount(
        &self,
        session_token: &str,
        code: &str,
    ) -> Result<DiscountPreview, CheckoutError> {
        let cart = self.carts.get_cart(session_token).await?;
        let subtotal = cart.subtotal().map_err(CartsServiceError::from)?;

        Ok(self.discounts.preview(code, subtotal).await?)
    }
}

#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Place an order for the cart behind `session_token` and clear the cart.
    async fn checkout(
        &self,
        session_token: &str,
        request: CheckoutRequest,
        discount_code: Option<String>,
    ) -> Result<PlacedOrder, CheckoutError>;

    /// What `code` would take off the cart's current subtotal.
    async fn preview_discount(
        &self,
        session_token: &str,
        code: &str,
    ) -> Result<DiscountPreview, CheckoutError>;
}
