//! Orders Repository

use atelier::status::{FulfillmentStatus, PaymentStatus};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rustc_hash::FxHashMap;
use sqlx::{
    FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar,
    types::Json,
};
use uuid::Uuid;

use crate::{
    database::{amount_param, quantity_param, try_get_amount, try_get_parsed, try_get_quantity},
    domain::orders::models::{
        Address, NewOrder, NewOrderItem, Order, OrderFilter, OrderItem, OrderUuid,
    },
};

const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const CREATE_ORDER_ITEM_SQL: &str = include_str!("sql/create_order_item.sql");
const SET_PAYMENT_INTENT_SQL: &str = include_str!("sql/set_payment_intent.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const LOCK_ORDER_SQL: &str = include_str!("sql/lock_order.sql");
const LOCK_ORDER_BY_PAYMENT_INTENT_SQL: &str = include_str!("sql/lock_order_by_payment_intent.sql");
const LIST_ORDERS_SQL: &str = include_str!("sql/list_orders.sql");
const COUNT_ORDERS_SQL: &str = include_str!("sql/count_orders.sql");
const GET_ORDER_ITEMS_SQL: &str = include_str!("sql/get_order_items.sql");
const UPDATE_FULFILLMENT_STATUS_SQL: &str = include_str!("sql/update_fulfillment_status.sql");
const UPDATE_PAYMENT_STATUS_SQL: &str = include_str!("sql/update_payment_status.sql");
const RECORD_REFUND_SQL: &str = include_str!("sql/record_refund.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &NewOrder,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_ORDER_SQL)
            .bind(order.uuid)
            .bind(&order.order_number)
            .bind(&order.customer_email)
            .bind(&order.customer_name)
            .bind(order.payment_method.as_str())
            .bind(&order.payment_gateway)
            .bind(amount_param(order.totals.subtotal, "subtotal")?)
            .bind(amount_param(order.totals.tax, "tax")?)
            .bind(amount_param(order.totals.discount, "discount")?)
            .bind(amount_param(order.totals.total, "total")?)
            .bind(&order.currency)
            .bind(order.discount_code.as_deref())
            .bind(Json(&order.shipping_address))
            .bind(Json(&order.billing_address))
            .bind(order.notes.as_deref())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn create_order_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        items: &[NewOrderItem],
    ) -> Result<(), sqlx::Error> {
        for item in items {
            query(CREATE_ORDER_ITEM_SQL)
                .bind(item.uuid)
                .bind(order)
                .bind(quantity_param(item.position, "position")?)
                .bind(item.product_uuid)
                .bind(item.variant_uuid)
                .bind(&item.product_name)
                .bind(item.variant_name.as_deref())
                .bind(&item.sku)
                .bind(quantity_param(item.quantity, "quantity")?)
                .bind(amount_param(item.unit_price, "unit_price")?)
                .bind(amount_param(item.total_price, "total_price")?)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }

    pub(crate) async fn set_payment_intent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        intent_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(SET_PAYMENT_INTENT_SQL)
            .bind(order)
            .bind(intent_id)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, sqlx::Error> {
        let order = query_as::<Postgres, Order>(GET_ORDER_SQL)
            .bind(order)
            .fetch_one(&mut **tx)
            .await?;

        self.with_items(tx, order).await
    }

    /// Fetch an order and hold its row lock until the transaction ends.
    pub(crate) async fn lock_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, sqlx::Error> {
        let order = query_as::<Postgres, Order>(LOCK_ORDER_SQL)
            .bind(order)
            .fetch_one(&mut **tx)
            .await?;

        self.with_items(tx, order).await
    }

    /// Lock the order paid through `intent_id`, if there is one.
    pub(crate) async fn lock_order_by_payment_intent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        intent_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let order = query_as::<Postgres, Order>(LOCK_ORDER_BY_PAYMENT_INTENT_SQL)
            .bind(intent_id)
            .fetch_optional(&mut **tx)
            .await?;

        match order {
            Some(order) => Ok(Some(self.with_items(tx, order).await?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn list_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &OrderFilter,
    ) -> Result<(Vec<Order>, u64), sqlx::Error> {
        let payment_status = filter.payment_status.map(PaymentStatus::as_str);
        let fulfillment_status = filter.fulfillment_status.map(FulfillmentStatus::as_str);
        let created_from = filter.created_from.map(SqlxTimestamp::from);
        let created_to = filter.created_to.map(SqlxTimestamp::from);

        let total: i64 = query_scalar(COUNT_ORDERS_SQL)
            .bind(payment_status)
            .bind(fulfillment_status)
            .bind(filter.customer_email.as_deref())
            .bind(created_from)
            .bind(created_to)
            .fetch_one(&mut **tx)
            .await?;

        let limit = i64::from(filter.per_page());
        let offset = i64::try_from(filter.offset()).unwrap_or(i64::MAX);

        let mut orders = query_as::<Postgres, Order>(LIST_ORDERS_SQL)
            .bind(payment_status)
            .bind(fulfillment_status)
            .bind(filter.customer_email.as_deref())
            .bind(created_from)
            .bind(created_to)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await?;

        let uuids: Vec<Uuid> = orders.iter().map(|order| order.uuid.into_uuid()).collect();
        let mut items = self.get_order_items(tx, &uuids).await?;

        for order in &mut orders {
            order.items = items.remove(&order.uuid).unwrap_or_default();
        }

        Ok((orders, u64::try_from(total).unwrap_or_default()))
    }

    pub(crate) async fn update_fulfillment_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        status: FulfillmentStatus,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_FULFILLMENT_STATUS_SQL)
            .bind(order)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn update_payment_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        status: PaymentStatus,
        failure_reason: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_PAYMENT_STATUS_SQL)
            .bind(order)
            .bind(status.as_str())
            .bind(failure_reason)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Mark a paid order refunded; a no-op for any other status.
    pub(crate) async fn record_refund(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        amount: u64,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(RECORD_REFUND_SQL)
            .bind(order)
            .bind(amount_param(amount, "refunded_amount")?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn with_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        mut order: Order,
    ) -> Result<Order, sqlx::Error> {
        let mut items = self
            .get_order_items(tx, &[order.uuid.into_uuid()])
            .await?;

        order.items = items.remove(&order.uuid).unwrap_or_default();

        Ok(order)
    }

    async fn get_order_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        orders: &[Uuid],
    ) -> Result<FxHashMap<OrderUuid, Vec<OrderItem>>, sqlx::Error> {
        let rows = query(GET_ORDER_ITEMS_SQL)
            .bind(orders)
            .fetch_all(&mut **tx)
            .await?;

        let mut items: FxHashMap<OrderUuid, Vec<OrderItem>> = FxHashMap::default();

        for row in rows {
            let order: OrderUuid = row.try_get("order_uuid")?;

            items
                .entry(order)
                .or_default()
                .push(OrderItem::from_row(&row)?);
        }

        Ok(items)
    }
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let Json(shipping_address) = row.try_get::<Json<Address>, _>("shipping_address")?;
        let Json(billing_address) = row.try_get::<Json<Address>, _>("billing_address")?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            order_number: row.try_get("order_number")?,
            customer_email: row.try_get("customer_email")?,
            customer_name: row.try_get("customer_name")?,
            payment_method: try_get_parsed(row, "payment_method")?,
            payment_gateway: row.try_get("payment_gateway")?,
            payment_status: try_get_parsed(row, "payment_status")?,
            payment_failure_reason: row.try_get("payment_failure_reason")?,
            fulfillment_status: try_get_parsed(row, "fulfillment_status")?,
            payment_intent_id: row.try_get("payment_intent_id")?,
            subtotal: try_get_amount(row, "subtotal")?,
            tax: try_get_amount(row, "tax")?,
            discount: try_get_amount(row, "discount")?,
            total: try_get_amount(row, "total")?,
            refunded_amount: try_get_amount(row, "refunded_amount")?,
            currency: row.try_get("currency")?,
            discount_code: row.try_get("discount_code")?,
            shipping_address,
            billing_address,
            notes: row.try_get("notes")?,
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            position: try_get_quantity(row, "position")?,
            product_uuid: row.try_get("product_uuid")?,
            variant_uuid: row.try_get("variant_uuid")?,
            product_name: row.try_get("product_name")?,
            variant_name: row.try_get("variant_name")?,
            sku: row.try_get("sku")?,
            quantity: try_get_quantity(row, "quantity")?,
            unit_price: try_get_amount(row, "unit_price")?,
            total_price: try_get_amount(row, "total_price")?,
        })
    }
}
