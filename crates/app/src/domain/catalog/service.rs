//! Catalog service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::catalog::{
        errors::CatalogServiceError,
        models::{NewProduct, NewProductVariant, Product, ProductUuid, ProductVariant, VariantUuid},
        repository::PgCatalogRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgCatalogService {
    db: Db,
    repository: PgCatalogRepository,
}

impl PgCatalogService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCatalogRepository::new(),
        }
    }
}

#[async_trait]
impl CatalogService for PgCatalogService {
    async fn get_product(&self, product: ProductUuid) -> Result<Product, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn get_variant(
        &self,
        product: ProductUuid,
        variant: VariantUuid,
    ) -> Result<ProductVariant, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let variant = self
            .repository
            .get_variant(&mut tx, product, variant)
            .await?;

        tx.commit().await?;

        Ok(variant)
    }

    #[tracing::instrument(
        name = "catalog.service.create_product",
        skip(self, product),
        fields(product_uuid = %product.uuid, sku = %product.sku),
        err
    )]
    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.repository.create_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(created)
    }

    #[tracing::instrument(
        name = "catalog.service.create_variant",
        skip(self, variant),
        fields(
            product_uuid = %variant.product_uuid,
            variant_uuid = %variant.uuid,
            sku = %variant.sku
        ),
        err
    )]
    async fn create_variant(
        &self,
        variant: NewProductVariant,
    ) -> Result<ProductVariant, CatalogServiceError> {
        let mut tx = self.db.begin().await?;

        let product = self
            .repository
            .get_product(&mut tx, variant.product_uuid)
            .await
            .map_err(|error| match CatalogServiceError::from(error) {
                CatalogServiceError::NotFound => CatalogServiceError::InvalidReference,
                other => other,
            })?;

        if product.base_price.checked_add_signed(variant.price_adjustment).is_none() {
            return Err(CatalogServiceError::InvalidData);
        }

        let created = self.repository.create_variant(&mut tx, variant).await?;

        tx.commit().await?;

        Ok(created)
    }
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Retrieve a live product.
    async fn get_product(&self, product: ProductUuid) -> Result<Product, CatalogServiceError>;

    /// Retrieve a live variant of `product`.
    async fn get_variant(
        &self,
        product: ProductUuid,
        variant: VariantUuid,
    ) -> Result<ProductVariant, CatalogServiceError>;

    /// Create a product.
    async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogServiceError>;

    /// Create a variant of an existing product.
    async fn create_variant(
        &self,
        variant: NewProductVariant,
    ) -> Result<ProductVariant, CatalogServiceError>;
}
