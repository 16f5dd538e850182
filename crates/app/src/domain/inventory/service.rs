//! Inventory service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        catalog::models::VariantUuid,
        inventory::{errors::InventoryError, ledger::PgInventoryLedger},
    },
};

#[derive(Debug, Clone)]
pub struct PgInventoryService {
    db: Db,
    ledger: PgInventoryLedger,
}

impl PgInventoryService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            ledger: PgInventoryLedger::new(),
        }
    }
}

#[async_trait]
impl InventoryService for PgInventoryService {
    async fn stock_level(&self, variant: VariantUuid) -> Result<u32, InventoryError> {
        let mut tx = self.db.begin().await?;

        let stock = self.ledger.stock_level(&mut tx, variant).await?;

        tx.commit().await?;

        Ok(stock)
    }

    #[tracing::instrument(
        name = "inventory.service.adjust_stock",
        skip(self),
        fields(variant_uuid = %variant, stock = tracing::field::Empty),
        err
    )]
    async fn adjust_stock(&self, variant: VariantUuid, delta: i64) -> Result<u32, InventoryError> {
        let mut tx = self.db.begin().await?;

        let stock = self.ledger.adjust(&mut tx, variant, delta).await?;

        tx.commit().await?;

        tracing::Span::current().record("stock", stock);

        Ok(stock)
    }
}

#[automock]
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Current stock of a live variant.
    async fn stock_level(&self, variant: VariantUuid) -> Result<u32, InventoryError>;

    /// Apply an operator correction (restock or write-off) and return the new stock level.
    async fn adjust_stock(&self, variant: VariantUuid, delta: i64) -> Result<u32, InventoryError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::{TestContext, helpers};

    use super::*;

    #[tokio::test]
    async fn adjust_stock_commits_the_new_level() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 2_500).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 1).await?;

        assert_eq!(ctx.inventory.adjust_stock(variant.uuid, 4).await?, 5);
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn failed_adjustment_keeps_previous_level() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 2_500).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 1).await?;

        let result = ctx.inventory.adjust_stock(variant.uuid, -2).await;

        assert!(
            matches!(result, Err(InventoryError::NegativeStock)),
            "expected NegativeStock, got {result:?}"
        );
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_variant_stock_level_is_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx.inventory.stock_level(VariantUuid::new()).await;

        assert!(
            matches!(result, Err(InventoryError::VariantNotFound)),
            "expected VariantNotFound, got {result:?}"
        );
    }
}
