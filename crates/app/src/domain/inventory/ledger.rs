//! Inventory Ledger

use sqlx::{Postgres, Transaction, query_scalar};

use crate::{
    database::quantity_param,
    domain::{catalog::models::VariantUuid, inventory::errors::InventoryError},
};

const RESERVE_STOCK_SQL: &str = include_str!("sql/reserve_stock.sql");
const RELEASE_STOCK_SQL: &str = include_str!("sql/release_stock.sql");
const ADJUST_STOCK_SQL: &str = include_str!("sql/adjust_stock.sql");
const GET_STOCK_SQL: &str = include_str!("sql/get_stock.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgInventoryLedger;

impl PgInventoryLedger {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Conditionally decrement stock, returning what is left.
    ///
    /// The decrement is a single `UPDATE ... WHERE stock >= $2`, so concurrent reservations
    /// against the same variant serialise on the row lock and never drive stock negative.
    pub(crate) async fn reserve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
        quantity: u32,
    ) -> Result<u32, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }

        let remaining: Option<i32> = query_scalar(RESERVE_STOCK_SQL)
            .bind(variant)
            .bind(quantity_param(quantity, "quantity")?)
            .fetch_optional(&mut **tx)
            .await?;

        match remaining {
            Some(remaining) => Ok(stock_from_column(remaining)),
            None => {
                self.stock_level(tx, variant).await?;

                Err(InventoryError::OutOfStock {
                    variant,
                    requested: quantity,
                })
            }
        }
    }

    /// Return stock to a variant.
    pub(crate) async fn release(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
        quantity: u32,
    ) -> Result<u32, InventoryError> {
        let remaining: i32 = query_scalar(RELEASE_STOCK_SQL)
            .bind(variant)
            .bind(quantity_param(quantity, "quantity")?)
            .fetch_one(&mut **tx)
            .await?;

        Ok(stock_from_column(remaining))
    }

    /// Apply an operator correction; never lets stock go below zero.
    pub(crate) async fn adjust(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
        delta: i64,
    ) -> Result<u32, InventoryError> {
        let remaining: Option<i32> = query_scalar(ADJUST_STOCK_SQL)
            .bind(variant)
            .bind(delta)
            .fetch_optional(&mut **tx)
            .await?;

        match remaining {
            Some(remaining) => Ok(stock_from_column(remaining)),
            None => {
                self.stock_level(tx, variant).await?;

                Err(InventoryError::NegativeStock)
            }
        }
    }

    pub(crate) async fn stock_level(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
    ) -> Result<u32, InventoryError> {
        let stock: i32 = query_scalar(GET_STOCK_SQL)
            .bind(variant)
            .fetch_one(&mut **tx)
            .await?;

        Ok(stock_from_column(stock))
    }
}

// stock has a CHECK (stock >= 0) constraint
fn stock_from_column(stock: i32) -> u32 {
    u32::try_from(stock).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use testresult::TestResult;
    use tokio::task::JoinSet;

    use crate::{
        database::Db,
        test::{TestContext, helpers},
    };

    use super::*;

    #[tokio::test]
    async fn reserve_decrements_and_release_restores() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 5).await?;

        let ledger = PgInventoryLedger::new();
        let mut tx = ctx.db.begin_test_transaction().await;

        assert_eq!(ledger.reserve(&mut tx, variant.uuid, 3).await?, 2);
        assert_eq!(ledger.release(&mut tx, variant.uuid, 3).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn reserve_rejects_insufficient_stock_without_changing_it() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 2).await?;

        let ledger = PgInventoryLedger::new();
        let mut tx = ctx.db.begin_test_transaction().await;

        let result = ledger.reserve(&mut tx, variant.uuid, 3).await;

        assert!(
            matches!(result, Err(InventoryError::OutOfStock { requested: 3, .. })),
            "expected OutOfStock, got {result:?}"
        );
        assert_eq!(ledger.stock_level(&mut tx, variant.uuid).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn reserve_unknown_variant_is_not_found() {
        let ctx = TestContext::new().await;
        let ledger = PgInventoryLedger::new();
        let mut tx = ctx.db.begin_test_transaction().await;

        let result = ledger.reserve(&mut tx, VariantUuid::new(), 1).await;

        assert!(
            matches!(result, Err(InventoryError::VariantNotFound)),
            "expected VariantNotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn rolled_back_reservations_leave_stock_untouched() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let first = helpers::create_variant(&ctx, &product, 0, 5).await?;
        let second = helpers::create_variant(&ctx, &product, 0, 1).await?;

        let ledger = PgInventoryLedger::new();

        {
            let mut tx = ctx.db.begin_test_transaction().await;

            ledger.reserve(&mut tx, first.uuid, 2).await?;

            let result = ledger.reserve(&mut tx, second.uuid, 2).await;

            assert!(result.is_err(), "second reservation must fail");
        }

        let mut tx = ctx.db.begin_test_transaction().await;

        assert_eq!(ledger.stock_level(&mut tx, first.uuid).await?, 5);
        assert_eq!(ledger.stock_level(&mut tx, second.uuid).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_reservations_never_oversell() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 5).await?;

        let db = Arc::new(Db::new(ctx.db.pool().clone()));
        let mut tasks = JoinSet::new();

        for _ in 0..12 {
            let db = Arc::clone(&db);
            let variant = variant.uuid;

            tasks.spawn(async move {
                let ledger = PgInventoryLedger::new();
                let mut tx = db.begin().await?;

                match ledger.reserve(&mut tx, variant, 1).await {
                    Ok(_) => {
                        tx.commit().await?;
                        Ok::<bool, sqlx::Error>(true)
                    }
                    Err(_) => Ok(false),
                }
            });
        }

        let mut reserved = 0;

        while let Some(result) = tasks.join_next().await {
            if result?? {
                reserved += 1;
            }
        }

        let mut tx = ctx.db.begin_test_transaction().await;

        assert_eq!(reserved, 5, "exactly the available stock can be reserved");
        assert_eq!(ledger_stock(&mut tx, variant.uuid).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn adjust_refuses_to_go_negative() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_000).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 2).await?;

        let ledger = PgInventoryLedger::new();
        let mut tx = ctx.db.begin_test_transaction().await;

        assert_eq!(ledger.adjust(&mut tx, variant.uuid, 3).await?, 5);

        let result = ledger.adjust(&mut tx, variant.uuid, -6).await;

        assert!(
            matches!(result, Err(InventoryError::NegativeStock)),
            "expected NegativeStock, got {result:?}"
        );

        Ok(())
    }

    async fn ledger_stock(
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
    ) -> Result<u32, InventoryError> {
        PgInventoryLedger::new().stock_level(tx, variant).await
    }
}
