//! Discounts Repository

use atelier::discounts::{DiscountKind, DiscountRule};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};

use crate::{
    database::{amount_param, try_get_amount},
    domain::discounts::models::{DiscountCode, DiscountCodeUuid, DiscountFilter, NewDiscountCode},
};

const FIND_DISCOUNT_CODE_SQL: &str = include_str!("sql/find_discount_code.sql");
const CREATE_DISCOUNT_CODE_SQL: &str = include_str!("sql/create_discount_code.sql");
const RECORD_DISCOUNT_USAGE_SQL: &str = include_str!("sql/record_discount_usage.sql");
const GET_DISCOUNT_CODE_SQL: &str = include_str!("sql/get_discount_code.sql");
const LOCK_DISCOUNT_CODE_SQL: &str = include_str!("sql/lock_discount_code.sql");
const LIST_DISCOUNT_CODES_SQL: &str = include_str!("sql/list_discount_codes.sql");
const COUNT_DISCOUNT_CODES_SQL: &str = include_str!("sql/count_discount_codes.sql");
const UPDATE_DISCOUNT_CODE_SQL: &str = include_str!("sql/update_discount_code.sql");
const DELETE_DISCOUNT_CODE_SQL: &str = include_str!("sql/delete_discount_code.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgDiscountsRepository;

impl PgDiscountsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Look up a code; `code` must already be normalised.
    pub(crate) async fn find_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<DiscountCode, sqlx::Error> {
        query_as::<Postgres, DiscountCode>(FIND_DISCOUNT_CODE_SQL)
            .bind(code)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_discount_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        discount: NewDiscountCode,
    ) -> Result<DiscountCode, sqlx::Error> {
        let max_uses = discount
            .max_uses
            .map(|max_uses| amount_param(max_uses, "max_uses"))
            .transpose()?;

        query_as::<Postgres, DiscountCode>(CREATE_DISCOUNT_CODE_SQL)
            .bind(discount.uuid)
            .bind(discount.code)
            .bind(discount.kind.as_str())
            .bind(amount_param(discount.value, "value")?)
            .bind(amount_param(discount.min_purchase, "min_purchase")?)
            .bind(max_uses)
            .bind(discount.starts_at.map(SqlxTimestamp::from))
            .bind(discount.expires_at.map(SqlxTimestamp::from))
            .bind(discount.active)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_discount_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        discount: DiscountCodeUuid,
    ) -> Result<DiscountCode, sqlx::Error> {
        query_as::<Postgres, DiscountCode>(GET_DISCOUNT_CODE_SQL)
            .bind(discount)
            .fetch_one(&mut **tx)
            .await
    }

    /// Load a code under a row lock for the rest of `tx`.
    pub(crate) async fn lock_discount_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        discount: DiscountCodeUuid,
    ) -> Result<DiscountCode, sqlx::Error> {
        query_as::<Postgres, DiscountCode>(LOCK_DISCOUNT_CODE_SQL)
            .bind(discount)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_discount_codes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &DiscountFilter,
    ) -> Result<(Vec<DiscountCode>, u64), sqlx::Error> {
        let kind = filter.kind.map(DiscountKind::as_str);

        let total: i64 = query_scalar(COUNT_DISCOUNT_CODES_SQL)
            .bind(filter.active)
            .bind(kind)
            .bind(filter.valid_only)
            .fetch_one(&mut **tx)
            .await?;

        let limit = i64::from(filter.per_page());
        let offset = i64::try_from(filter.offset()).unwrap_or(i64::MAX);

        let discounts = query_as::<Postgres, DiscountCode>(LIST_DISCOUNT_CODES_SQL)
            .bind(filter.active)
            .bind(kind)
            .bind(filter.valid_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await?;

        Ok((discounts, u64::try_from(total).unwrap_or_default()))
    }

    /// Write every editable field of `discount` back.
    pub(crate) async fn update_discount_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        discount: &DiscountCode,
    ) -> Result<DiscountCode, sqlx::Error> {
        let rule = &discount.rule;

        let max_uses = rule
            .max_uses
            .map(|max_uses| amount_param(max_uses, "max_uses"))
            .transpose()?;

        query_as::<Postgres, DiscountCode>(UPDATE_DISCOUNT_CODE_SQL)
            .bind(discount.uuid)
            .bind(&discount.code)
            .bind(rule.kind.as_str())
            .bind(amount_param(rule.value, "value")?)
            .bind(amount_param(rule.min_purchase, "min_purchase")?)
            .bind(max_uses)
            .bind(rule.starts_at.map(SqlxTimestamp::from))
            .bind(rule.expires_at.map(SqlxTimestamp::from))
            .bind(rule.active)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_discount_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        discount: DiscountCodeUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_DISCOUNT_CODE_SQL)
            .bind(discount)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn record_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        discount: DiscountCodeUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(RECORD_DISCOUNT_USAGE_SQL)
            .bind(discount)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for DiscountCode {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("kind")?;
        let kind = kind
            .parse::<DiscountKind>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "kind".to_string(),
                source: Box::new(e),
            })?;

        let max_uses = row
            .try_get::<Option<i64>, _>("max_uses")?
            .map(u64::try_from)
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "max_uses".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            code: row.try_get("code")?,
            rule: DiscountRule {
                kind,
                value: try_get_amount(row, "value")?,
                min_purchase: try_get_amount(row, "min_purchase")?,
                max_uses,
                used_count: try_get_amount(row, "used_count")?,
                starts_at: row
                    .try_get::<Option<SqlxTimestamp>, _>("starts_at")?
                    .map(SqlxTimestamp::to_jiff),
                expires_at: row
                    .try_get::<Option<SqlxTimestamp>, _>("expires_at")?
                    .map(SqlxTimestamp::to_jiff),
                active: row.try_get("active")?,
            },
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
