//! Test helpers.

use std::sync::Arc;

use atelier::{
    pricing::Totals,
    status::{FulfillmentStatus, PaymentStatus},
};
use atelier_app::{
    context::AppContext,
    domain::{
        carts::{
            MockCartsService,
            models::{Cart, CartItem, CartItemUuid, CartUuid},
        },
        catalog::{MockCatalogService, models::ProductUuid},
        checkout::MockCheckoutService,
        discounts::MockDiscountsService,
        inventory::MockInventoryService,
        orders::{
            MockOrdersService,
            models::{Address, Order, OrderItem, OrderItemUuid, OrderUuid, PaymentMethod},
        },
        reconciler::MockReconcilerService,
    },
    scheduler::MockJobsService,
    secrets::SecretString,
};
use jiff::Timestamp;
use salvo::{affix_state::inject, http::header::SET_COOKIE, prelude::*};

use crate::{carts::session::SESSION_COOKIE, state::State};

pub(crate) const TEST_ADMIN_TOKEN: &str = "test-admin-token";

pub(crate) const TEST_SESSION: &str = "0f3c9a7d2b1e4c5a8d6f0e9b7a3c2d1e";

/// A context whose services panic on any call; tests swap in the mocks they need.
pub(crate) fn app_context() -> AppContext {
    AppContext {
        carts: Arc::new(MockCartsService::new()),
        catalog: Arc::new(MockCatalogService::new()),
        inventory: Arc::new(MockInventoryService::new()),
        discounts: Arc::new(MockDiscountsService::new()),
        orders: Arc::new(MockOrdersService::new()),
        checkout: Arc::new(MockCheckoutService::new()),
        reconciler: Arc::new(MockReconcilerService::new()),
        jobs: Arc::new(MockJobsService::new()),
    }
}

pub(crate) fn service(app: AppContext, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(State::shared(
                app,
                SecretString::new(TEST_ADMIN_TOKEN),
            )))
            .push(route),
    )
}

pub(crate) fn carts_service(carts: MockCartsService, route: Router) -> Service {
    service(
        AppContext {
            carts: Arc::new(carts),
            ..app_context()
        },
        route,
    )
}

/// The cart session token a response hands out, if any.
pub(crate) fn issued_session(res: &Response) -> Option<String> {
    res.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            res.headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .find_map(|value| {
                    value
                        .strip_prefix(SESSION_COOKIE)
                        .and_then(|rest| rest.strip_prefix('='))
                        .and_then(|rest| rest.split(';').next())
                        .map(str::to_string)
                })
        })
}

/// Carts mock that prices every cart at its subtotal with no tax.
pub(crate) fn carts_mock() -> MockCartsService {
    let mut carts = MockCartsService::new();

    carts.expect_calculate_total().returning(|cart| {
        let subtotal = cart.subtotal()?;

        Ok(Totals {
            subtotal,
            tax: 0,
            discount: 0,
            total: subtotal,
        })
    });
    carts.expect_currency().return_const("EUR".to_string());

    carts
}

pub(crate) fn make_cart(quantity: u32) -> Cart {
    let now = Timestamp::UNIX_EPOCH;

    Cart {
        uuid: CartUuid::new(),
        session_token: TEST_SESSION.to_string(),
        user_uuid: None,
        items: vec![CartItem {
            uuid: CartItemUuid::new(),
            product_uuid: ProductUuid::new(),
            variant_uuid: None,
            product_title: "Harbour at Dusk".to_string(),
            variant_name: None,
            sku: "PRINT-HARBOUR".to_string(),
            unit_price: 3_000,
            quantity,
            created_at: now,
            updated_at: now,
        }],
        expires_at: now,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn make_address() -> Address {
    Address {
        street: "12 Rue des Arts".to_string(),
        city: "Lyon".to_string(),
        state: String::new(),
        postal_code: "69001".to_string(),
        country: "FR".to_string(),
    }
}

pub(crate) fn make_order(payment_status: PaymentStatus) -> Order {
    let now = Timestamp::UNIX_EPOCH;

    Order {
        uuid: OrderUuid::new(),
        order_number: "ORD-20260301-101500-K7QX2M".to_string(),
        customer_email: "buyer@example.com".to_string(),
        customer_name: "Ada Buyer".to_string(),
        payment_method: PaymentMethod::CreditCard,
        payment_gateway: "mock".to_string(),
        payment_status,
        payment_failure_reason: None,
        fulfillment_status: FulfillmentStatus::Unfulfilled,
        payment_intent_id: Some("mock_pi_1".to_string()),
        subtotal: 3_000,
        tax: 0,
        discount: 0,
        total: 3_000,
        refunded_amount: 0,
        currency: "EUR".to_string(),
        discount_code: None,
        shipping_address: make_address(),
        billing_address: make_address(),
        notes: None,
        items: vec![OrderItem {
            uuid: OrderItemUuid::new(),
            position: 0,
            product_uuid: ProductUuid::new(),
            variant_uuid: None,
            product_name: "Harbour at Dusk".to_string(),
            variant_name: None,
            sku: "PRINT-HARBOUR".to_string(),
            quantity: 1,
            unit_price: 3_000,
            total_price: 3_000,
        }],
        created_at: now,
        updated_at: now,
    }
}
