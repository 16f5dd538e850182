//! Carts service.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use atelier::pricing::{NoTax, TaxPolicy, Totals};
use jiff::Timestamp;
use mockall::automock;
use uuid::Uuid;

use crate::{
    database::Db,
    domain::{
        carts::{
            errors::CartsServiceError,
            models::{Cart, CartItemUuid, CartUuid, NewCartItem},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        catalog::{CatalogServiceError, PgCatalogRepository},
    },
};

/// How long a cart lives after it is first created.
pub const DEFAULT_CART_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Pricing and lifetime settings shared by every cart.
#[derive(Debug, Clone)]
pub struct CartSettings {
    pub ttl: Duration,
    pub currency: String,
    pub tax_policy: Arc<dyn TaxPolicy>,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CART_TTL,
            currency: "EUR".to_string(),
            tax_policy: Arc::new(NoTax),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    settings: CartSettings,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
    catalog_repository: PgCatalogRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db, settings: CartSettings) -> Self {
        Self {
            db,
            settings,
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
            catalog_repository: PgCatalogRepository::new(),
        }
    }

    fn ttl_seconds(&self) -> i64 {
        i64::try_from(self.settings.ttl.as_secs()).unwrap_or(i64::MAX)
    }

    async fn load_items(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        mut cart: Cart,
    ) -> Result<Cart, CartsServiceError> {
        cart.items = self.items_repository.get_cart_items(tx, cart.uuid).await?;

        Ok(cart)
    }

    /// Advisory stock check; the real reservation happens at checkout.
    async fn check_availability(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        item: &NewCartItem,
    ) -> Result<(), CartsServiceError> {
        let missing = |error: sqlx::Error| match CatalogServiceError::from(error) {
            CatalogServiceError::NotFound => CartsServiceError::ProductNotFound,
            CatalogServiceError::Sql(source) => CartsServiceError::Sql(source),
            _ => CartsServiceError::InvalidData,
        };

        self.catalog_repository
            .get_product(tx, item.product_uuid)
            .await
            .map_err(missing)?;

        if let Some(variant) = item.variant_uuid {
            let variant = self
                .catalog_repository
                .get_variant(tx, item.product_uuid, variant)
                .await
                .map_err(missing)?;

            if variant.stock < item.quantity {
                return Err(CartsServiceError::OutOfStock {
                    requested: item.quantity,
                    available: variant.stock,
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_or_create(&self, session_token: &str) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .get_or_create_cart(&mut tx, session_token, self.ttl_seconds())
            .await?;

        let cart = self.load_items(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn get_cart(&self, session_token: &str) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .find_cart(&mut tx, session_token)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        let cart = self.load_items(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self, session_token),
        fields(
            product_uuid = %item.product_uuid,
            variant_uuid = ?item.variant_uuid,
            quantity = item.quantity,
            cart_uuid = tracing::field::Empty
        ),
        err
    )]
    async fn add_item(
        &self,
        session_token: &str,
        item: NewCartItem,
    ) -> Result<Cart, CartsServiceError> {
        if item.quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        self.check_availability(&mut tx, &item).await?;

        let cart = self
            .carts_repository
            .get_or_create_cart(&mut tx, session_token, self.ttl_seconds())
            .await?;

        tracing::Span::current().record("cart_uuid", tracing::field::display(cart.uuid));

        self.items_repository
            .upsert_cart_item(&mut tx, cart.uuid, item)
            .await?;

        let cart = self.load_items(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.update_item_quantity",
        skip(self, session_token),
        fields(item_uuid = %item),
        err
    )]
    async fn update_item_quantity(
        &self,
        session_token: &str,
        item: CartItemUuid,
        quantity: i64,
    ) -> Result<Cart, CartsServiceError> {
        let quantity = u32::try_from(quantity).map_err(|_| CartsServiceError::InvalidQuantity)?;

        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .find_cart(&mut tx, session_token)
            .await?
            .ok_or(CartsServiceError::ItemNotFound)?;

        let rows_affected = if quantity == 0 {
            self.items_repository
                .delete_cart_item(&mut tx, cart.uuid, item)
                .await?
        } else {
            self.items_repository
                .update_quantity(&mut tx, cart.uuid, item, quantity)
                .await?
        };

        if rows_affected == 0 {
            return Err(CartsServiceError::ItemNotFound);
        }

        let cart = self.load_items(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn remove_item(
        &self,
        session_token: &str,
        item: CartItemUuid,
    ) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .find_cart(&mut tx, session_token)
            .await?
            .ok_or(CartsServiceError::ItemNotFound)?;

        let rows_affected = self
            .items_repository
            .delete_cart_item(&mut tx, cart.uuid, item)
            .await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::ItemNotFound);
        }

        let cart = self.load_items(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn clear_cart(&self, session_token: &str) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        if let Some(cart) = self
            .carts_repository
            .find_cart(&mut tx, session_token)
            .await?
        {
            self.items_repository
                .clear_cart_items(&mut tx, cart.uuid)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "carts.service.merge_carts",
        skip(self, guest_token, user_token),
        fields(user_uuid = %user, moved_lines = tracing::field::Empty),
        err
    )]
    async fn merge_carts(
        &self,
        guest_token: &str,
        user_token: &str,
        user: Uuid,
    ) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let user_cart = self
            .carts_repository
            .get_or_create_cart(&mut tx, user_token, self.ttl_seconds())
            .await?;

        self.carts_repository
            .assign_user(&mut tx, user_cart.uuid, user)
            .await?;

        if guest_token != user_token
            && let Some(guest_cart) = self.carts_repository.find_cart(&mut tx, guest_token).await?
        {
            let moved = self
                .items_repository
                .move_cart_items(&mut tx, guest_cart.uuid, user_cart.uuid)
                .await?;

            tracing::Span::current().record("moved_lines", moved);

            self.carts_repository
                .delete_cart(&mut tx, guest_cart.uuid)
                .await?;
        }

        let mut cart = self.load_items(&mut tx, user_cart).await?;
        cart.user_uuid = Some(user);

        tx.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.delete_expired_carts",
        skip(self),
        fields(deleted = tracing::field::Empty),
        err
    )]
    async fn delete_expired_carts(&self, now: Timestamp) -> Result<u64, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let deleted = self
            .carts_repository
            .delete_expired_carts(&mut tx, now)
            .await?;

        tx.commit().await?;

        tracing::Span::current().record("deleted", deleted);

        Ok(deleted)
    }

    async fn delete_cart(&self, cart: CartUuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.carts_repository.delete_cart(&mut tx, cart).await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    fn calculate_total(&self, cart: &Cart) -> Result<Totals, CartsServiceError> {
        let subtotal = cart.subtotal()?;

        Ok(Totals::compute(
            subtotal,
            0,
            self.settings.tax_policy.as_ref(),
            &self.settings.currency,
        )?)
    }

    fn currency(&self) -> String {
        self.settings.currency.clone()
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve the live cart for a session token, creating an empty one if there is none.
    async fn get_or_create(&self, session_token: &str) -> Result<Cart, CartsServiceError>;

    /// Retrieve the live cart for a session token.
    async fn get_cart(&self, session_token: &str) -> Result<Cart, CartsServiceError>;

    /// Add a line to the cart, merging it into an existing (product, variant) line.
    async fn add_item(
        &self,
        session_token: &str,
        item: NewCartItem,
    ) -> Result<Cart, CartsServiceError>;

    /// Set a line's quantity; zero removes the line.
    async fn update_item_quantity(
        &self,
        session_token: &str,
        item: CartItemUuid,
        quantity: i64,
    ) -> Result<Cart, CartsServiceError>;

    /// Remove a line.
    async fn remove_item(
        &self,
        session_token: &str,
        item: CartItemUuid,
    ) -> Result<Cart, CartsServiceError>;

    /// Remove every line, keeping the cart itself.
    async fn clear_cart(&self, session_token: &str) -> Result<(), CartsServiceError>;

    /// Move a guest cart's lines into the user's cart and delete the guest cart.
    async fn merge_carts(
        &self,
        guest_token: &str,
        user_token: &str,
        user: Uuid,
    ) -> Result<Cart, CartsServiceError>;

    /// Delete every cart that expired at or before `now`, returning how many were removed.
    async fn delete_expired_carts(&self, now: Timestamp) -> Result<u64, CartsServiceError>;

    /// Delete a cart and its lines.
    async fn delete_cart(&self, cart: CartUuid) -> Result<(), CartsServiceError>;

    /// Totals at live prices. Discounts only apply at checkout, so `discount` is always zero.
    fn calculate_total(&self, cart: &Cart) -> Result<Totals, CartsServiceError>;

    /// Currency every cart is priced in.
    fn currency(&self) -> String;
}

#[cfg(test)]
mod tests {
    use atelier::pricing::FlatRateTax;
    use jiff::SignedDuration;
    use testresult::TestResult;
    use tokio::task::JoinSet;

    use crate::{
        domain::catalog::models::{ProductUuid, VariantUuid},
        test::{TestContext, helpers},
    };

    use super::*;

    fn line(product: ProductUuid, variant: Option<VariantUuid>, quantity: u32) -> NewCartItem {
        NewCartItem {
            product_uuid: product,
            variant_uuid: variant,
            quantity,
        }
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() -> TestResult {
        let ctx = TestContext::new().await;

        let first = ctx.carts.get_or_create("session-a").await?;
        let second = ctx.carts.get_or_create("session-a").await?;

        assert_eq!(first.uuid, second.uuid);
        assert!(first.is_empty());
        assert_eq!(first.expires_at, second.expires_at, "expiry is not extended");

        let ttl = first.expires_at.duration_since(first.created_at);

        assert!(
            ttl >= SignedDuration::from_hours(30 * 24 - 1),
            "cart should live for thirty days, got {ttl:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_cart_unknown_token_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx.carts.get_cart("missing").await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn adding_same_line_twice_merges_quantity() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_500).await?;
        let variant = helpers::create_variant(&ctx, &product, 250, 10).await?;

        ctx.carts
            .add_item("session", line(product.uuid, Some(variant.uuid), 2))
            .await?;

        let cart = ctx
            .carts
            .add_item("session", line(product.uuid, Some(variant.uuid), 3))
            .await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.items[0].unit_price, 1_750);
        assert_eq!(cart.items[0].sku, variant.sku);

        Ok(())
    }

    #[tokio::test]
    async fn lines_without_variant_are_distinct_from_variant_lines() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 10).await?;

        ctx.carts
            .add_item("session", line(product.uuid, None, 1))
            .await?;
        ctx.carts
            .add_item("session", line(product.uuid, None, 1))
            .await?;

        let cart = ctx
            .carts
            .add_item("session", line(product.uuid, Some(variant.uuid), 1))
            .await?;

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.items[0].variant_uuid, None);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_adds_do_not_lose_updates() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 100).await?;

        ctx.carts.get_or_create("shared").await?;

        let carts = Arc::new(ctx.carts.clone());
        let mut tasks = JoinSet::new();

        for _ in 0..8 {
            let carts = Arc::clone(&carts);
            let item = line(product.uuid, Some(variant.uuid), 1);

            tasks.spawn(async move { carts.add_item("shared", item).await });
        }

        while let Some(result) = tasks.join_next().await {
            result??;
        }

        let cart = ctx.carts.get_cart("shared").await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 8);

        Ok(())
    }

    #[tokio::test]
    async fn add_item_above_live_stock_is_out_of_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 2).await?;

        let result = ctx
            .carts
            .add_item("session", line(product.uuid, Some(variant.uuid), 3))
            .await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::OutOfStock {
                    requested: 3,
                    available: 2
                })
            ),
            "expected OutOfStock, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn add_item_rejects_zero_quantity() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;

        let result = ctx
            .carts
            .add_item("session", line(product.uuid, None, 0))
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::InvalidQuantity)),
            "expected InvalidQuantity, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn add_item_unknown_product_or_variant_is_product_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;

        let unknown_product = ctx
            .carts
            .add_item("session", line(ProductUuid::new(), None, 1))
            .await;

        let unknown_variant = ctx
            .carts
            .add_item("session", line(product.uuid, Some(VariantUuid::new()), 1))
            .await;

        assert!(
            matches!(unknown_product, Err(CartsServiceError::ProductNotFound)),
            "expected ProductNotFound, got {unknown_product:?}"
        );
        assert!(
            matches!(unknown_variant, Err(CartsServiceError::ProductNotFound)),
            "expected ProductNotFound, got {unknown_variant:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_quantity_sets_removes_and_validates() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;

        let cart = ctx
            .carts
            .add_item("session", line(product.uuid, None, 1))
            .await?;
        let item = cart.items[0].uuid;

        let cart = ctx.carts.update_item_quantity("session", item, 4).await?;
        assert_eq!(cart.items[0].quantity, 4);

        let negative = ctx.carts.update_item_quantity("session", item, -1).await;
        assert!(
            matches!(negative, Err(CartsServiceError::InvalidQuantity)),
            "expected InvalidQuantity, got {negative:?}"
        );

        let cart = ctx.carts.update_item_quantity("session", item, 0).await?;
        assert!(cart.is_empty());

        let missing = ctx.carts.update_item_quantity("session", item, 2).await;
        assert!(
            matches!(missing, Err(CartsServiceError::ItemNotFound)),
            "expected ItemNotFound, got {missing:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn item_of_another_cart_cannot_be_removed() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;

        let cart = ctx
            .carts
            .add_item("owner", line(product.uuid, None, 1))
            .await?;
        ctx.carts.get_or_create("intruder").await?;

        let result = ctx.carts.remove_item("intruder", cart.items[0].uuid).await;

        assert!(
            matches!(result, Err(CartsServiceError::ItemNotFound)),
            "expected ItemNotFound, got {result:?}"
        );
        assert_eq!(ctx.carts.get_cart("owner").await?.items.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn clear_cart_keeps_cart_but_drops_lines() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;

        let before = ctx
            .carts
            .add_item("session", line(product.uuid, None, 2))
            .await?;

        ctx.carts.clear_cart("session").await?;

        let after = ctx.carts.get_cart("session").await?;

        assert_eq!(after.uuid, before.uuid);
        assert!(after.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn merge_moves_guest_lines_and_deletes_guest_cart() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let other = helpers::create_product(&ctx, 500).await?;
        let user = Uuid::now_v7();

        ctx.carts
            .add_item("guest", line(product.uuid, None, 2))
            .await?;
        ctx.carts
            .add_item("guest", line(other.uuid, None, 1))
            .await?;
        ctx.carts
            .add_item("user", line(product.uuid, None, 1))
            .await?;

        let merged = ctx.carts.merge_carts("guest", "user", user).await?;

        assert_eq!(merged.user_uuid, Some(user));
        assert_eq!(merged.items.len(), 2);
        assert_eq!(merged.items[0].quantity, 3);
        assert_eq!(merged.items[1].quantity, 1);

        let guest = ctx.carts.get_cart("guest").await;

        assert!(
            matches!(guest, Err(CartsServiceError::NotFound)),
            "guest cart should be gone, got {guest:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn sweep_deletes_only_expired_carts() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.carts.get_or_create("fresh").await?;

        let now = Timestamp::now();

        assert_eq!(ctx.carts.delete_expired_carts(now).await?, 0);

        let later = now + SignedDuration::from_hours(31 * 24);

        assert_eq!(ctx.carts.delete_expired_carts(later).await?, 1);
        assert!(ctx.carts.get_cart("fresh").await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn calculate_total_applies_tax_and_never_discounts() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;

        let cart = ctx
            .carts
            .add_item("session", line(product.uuid, None, 3))
            .await?;

        let taxed = PgCartsService::new(
            Db::new(ctx.db.pool().clone()),
            CartSettings {
                tax_policy: Arc::new(FlatRateTax::new(2_000)),
                ..CartSettings::default()
            },
        );

        assert_eq!(
            taxed.calculate_total(&cart)?,
            Totals {
                subtotal: 3_000,
                tax: 600,
                discount: 0,
                total: 3_600,
            }
        );

        Ok(())
    }
}
