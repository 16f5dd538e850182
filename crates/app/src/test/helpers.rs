//! Test Helpers

use atelier::discounts::DiscountKind;
use testresult::TestResult;

use crate::{
    domain::{
        carts::{
            CartsService, CartsServiceError,
            models::{Cart, NewCartItem},
        },
        catalog::{
            CatalogService, CatalogServiceError,
            models::{
                NewProduct, NewProductVariant, Product, ProductUuid, ProductVariant, VariantUuid,
            },
        },
        discounts::{
            DiscountsService, DiscountsServiceError,
            models::{DiscountCode, DiscountCodeUuid, NewDiscountCode},
        },
        orders::{
            OrdersService,
            models::{Address, CheckoutRequest, PaymentMethod, PlacedOrder},
        },
    },
    test::TestContext,
};

pub(crate) const CHECKOUT_SESSION: &str = "checkout-session";

pub(crate) async fn create_product(
    ctx: &TestContext,
    base_price: u64,
) -> Result<Product, CatalogServiceError> {
    let uuid = ProductUuid::new();

    ctx.catalog
        .create_product(NewProduct {
            uuid,
            title: "Harbour at Dusk".to_string(),
            sku: format!("PRINT-{}", uuid.into_uuid().simple()),
            base_price,
            currency: "EUR".to_string(),
        })
        .await
}

pub(crate) async fn create_variant(
    ctx: &TestContext,
    product: &Product,
    price_adjustment: i64,
    stock: u32,
) -> Result<ProductVariant, CatalogServiceError> {
    let uuid = VariantUuid::new();

    ctx.catalog
        .create_variant(NewProductVariant {
            uuid,
            product_uuid: product.uuid,
            sku: format!("{}-{}", product.sku, uuid.into_uuid().simple()),
            name: "A3 framed".to_string(),
            price_adjustment,
            stock,
        })
        .await
}

pub(crate) async fn create_discount(
    ctx: &TestContext,
    code: &str,
    kind: DiscountKind,
    value: u64,
    min_purchase: u64,
) -> Result<DiscountCode, DiscountsServiceError> {
    ctx.discounts
        .create_discount_code(NewDiscountCode {
            uuid: DiscountCodeUuid::new(),
            code: code.to_string(),
            kind,
            value,
            min_purchase,
            max_uses: None,
            starts_at: None,
            expires_at: None,
            active: true,
        })
        .await
}

/// Fill the cart behind `session` with `lines` of (product, variant, quantity).
pub(crate) async fn cart_in_session(
    ctx: &TestContext,
    session: &str,
    lines: &[(ProductUuid, Option<VariantUuid>, u32)],
) -> Result<Cart, CartsServiceError> {
    let mut cart = ctx.carts.get_or_create(session).await?;

    for &(product_uuid, variant_uuid, quantity) in lines {
        cart = ctx
            .carts
            .add_item(
                session,
                NewCartItem {
                    product_uuid,
                    variant_uuid,
                    quantity,
                },
            )
            .await?;
    }

    Ok(cart)
}

pub(crate) async fn cart_with(
    ctx: &TestContext,
    lines: &[(ProductUuid, Option<VariantUuid>, u32)],
) -> Result<Cart, CartsServiceError> {
    cart_in_session(ctx, CHECKOUT_SESSION, lines).await
}

pub(crate) fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        email: "buyer@example.com".to_string(),
        name: "Ada Buyer".to_string(),
        payment_method: PaymentMethod::CreditCard,
        shipping_address: Address {
            street: "12 Rue des Arts".to_string(),
            city: "Lyon".to_string(),
            state: String::new(),
            postal_code: "69001".to_string(),
            country: "FR".to_string(),
        },
        billing_address: None,
        notes: None,
    }
}

/// Place a one-line order of `quantity` units of a fresh variant holding `stock`.
pub(crate) async fn place_order(
    ctx: &TestContext,
    price: u64,
    stock: u32,
    quantity: u32,
) -> TestResult<(PlacedOrder, ProductVariant)> {
    let product = create_product(ctx, price).await?;
    let variant = create_variant(ctx, &product, 0, stock).await?;

    let cart = cart_with(ctx, &[(product.uuid, Some(variant.uuid), quantity)]).await?;

    let placed = ctx
        .orders
        .create_order(cart, checkout_request(), None)
        .await?;

    Ok((placed, variant))
}

pub(crate) async fn count_orders(ctx: &TestContext) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(ctx.db.pool())
        .await
}
