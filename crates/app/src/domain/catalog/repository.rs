//! Catalog Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::{
    database::{amount_param, quantity_param, try_get_amount, try_get_quantity},
    domain::catalog::models::{
        NewProduct, NewProductVariant, Product, ProductUuid, ProductVariant, VariantUuid,
    },
};

const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const GET_VARIANT_SQL: &str = include_str!("sql/get_variant.sql");
const CREATE_VARIANT_SQL: &str = include_str!("sql/create_variant.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCatalogRepository;

impl PgCatalogRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(GET_PRODUCT_SQL)
            .bind(product)
            .fetch_one(&mut **tx)
            .await
    }

    /// Fetch a variant, requiring it to belong to `product`.
    pub(crate) async fn get_variant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        variant: VariantUuid,
    ) -> Result<ProductVariant, sqlx::Error> {
        query_as::<Postgres, ProductVariant>(GET_VARIANT_SQL)
            .bind(variant)
            .bind(product)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: NewProduct,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(CREATE_PRODUCT_SQL)
            .bind(product.uuid)
            .bind(product.title)
            .bind(product.sku)
            .bind(amount_param(product.base_price, "base_price")?)
            .bind(product.currency)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_variant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: NewProductVariant,
    ) -> Result<ProductVariant, sqlx::Error> {
        query_as::<Postgres, ProductVariant>(CREATE_VARIANT_SQL)
            .bind(variant.uuid)
            .bind(variant.product_uuid)
            .bind(variant.sku)
            .bind(variant.name)
            .bind(variant.price_adjustment)
            .bind(quantity_param(variant.stock, "stock")?)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            title: row.try_get("title")?,
            sku: row.try_get("sku")?,
            base_price: try_get_amount(row, "base_price")?,
            currency: row.try_get("currency")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ProductVariant {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            product_uuid: row.try_get("product_uuid")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            price_adjustment: row.try_get("price_adjustment")?,
            stock: try_get_quantity(row, "stock")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
