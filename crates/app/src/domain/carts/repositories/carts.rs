//! Carts Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::carts::models::{Cart, CartUuid};

const DELETE_EXPIRED_CART_FOR_TOKEN_SQL: &str =
    include_str!("../sql/delete_expired_cart_for_token.sql");
const GET_OR_CREATE_CART_SQL: &str = include_str!("../sql/get_or_create_cart.sql");
const GET_CART_BY_TOKEN_SQL: &str = include_str!("../sql/get_cart_by_token.sql");
const ASSIGN_CART_USER_SQL: &str = include_str!("../sql/assign_cart_user.sql");
const DELETE_CART_SQL: &str = include_str!("../sql/delete_cart.sql");
const DELETE_EXPIRED_CARTS_SQL: &str = include_str!("../sql/delete_expired_carts.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Return the live cart for `token`, creating it with `ttl_seconds` to live if needed.
    ///
    /// A lapsed cart that the sweep has not reached yet is replaced rather than revived.
    pub(crate) async fn get_or_create_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: &str,
        ttl_seconds: i64,
    ) -> Result<Cart, sqlx::Error> {
        query(DELETE_EXPIRED_CART_FOR_TOKEN_SQL)
            .bind(token)
            .execute(&mut **tx)
            .await?;

        query_as::<Postgres, Cart>(GET_OR_CREATE_CART_SQL)
            .bind(CartUuid::new())
            .bind(token)
            .bind(ttl_seconds)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        token: &str,
    ) -> Result<Option<Cart>, sqlx::Error> {
        query_as::<Postgres, Cart>(GET_CART_BY_TOKEN_SQL)
            .bind(token)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn assign_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        user: Uuid,
    ) -> Result<(), sqlx::Error> {
        query(ASSIGN_CART_USER_SQL)
            .bind(cart)
            .bind(user)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn delete_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_SQL)
            .bind(cart)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn delete_expired_carts(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_EXPIRED_CARTS_SQL)
            .bind(SqlxTimestamp::from(now))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for Cart {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            session_token: row.try_get("session_token")?,
            user_uuid: row.try_get("user_uuid")?,
            items: Vec::new(),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
