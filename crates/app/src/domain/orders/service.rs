//! Orders service.
//!
//! Checkout runs as one database transaction: every line is priced and its stock reserved, the
//! order is written, a payment intent is opened and its id stored before commit. Any failure rolls
//! the whole attempt back, and a live intent whose commit failed is cancelled at the gateway.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use atelier::{
    money::{MoneyError, line_total},
    pricing::{self, NoTax, TaxPolicy, Totals},
    status::FulfillmentStatus,
};
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::Instrument;

use crate::{
    database::Db,
    domain::{
        carts::models::Cart,
        catalog::{PgCatalogRepository, models::VariantUuid},
        discounts::{PgDiscountsRepository, models::DiscountCode},
        inventory::PgInventoryLedger,
        orders::{
            errors::OrdersServiceError,
            models::{
                CheckoutRequest, NewOrder, NewOrderItem, Order, OrderFilter, OrderItemUuid,
                OrderPage, OrderUuid, PlacedOrder, generate_order_number,
            },
            repository::PgOrdersRepository,
        },
    },
    notifications::{NotificationEvent, Notifier},
    payments::{
        CreatePaymentIntent, PaymentGateway, PaymentGatewayError, PaymentIntent, PaymentLineItem,
        validate_amount,
    },
};

/// Longest a checkout waits for the gateway to open an intent.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

/// Reservations leaving this many units or fewer raise a low-stock notification.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 2;

#[derive(Debug, Clone)]
pub struct OrderSettings {
    pub currency: String,
    pub tax_policy: Arc<dyn TaxPolicy>,
    pub gateway_timeout: Duration,
    pub low_stock_threshold: u32,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            tax_policy: Arc::new(NoTax),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

#[derive(Debug)]
struct Reservation {
    variant: VariantUuid,
    sku: String,
    remaining: u32,
}

#[derive(Clone)]
pub struct PgOrdersService {
    db: Db,
    settings: OrderSettings,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    repository: PgOrdersRepository,
    catalog: PgCatalogRepository,
    ledger: PgInventoryLedger,
    discounts: PgDiscountsRepository,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(
        db: Db,
        settings: OrderSettings,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            settings,
            gateway,
            notifier,
            repository: PgOrdersRepository::new(),
            catalog: PgCatalogRepository::new(),
            ledger: PgInventoryLedger::new(),
            discounts: PgDiscountsRepository::new(),
        }
    }

    #[tracing::instrument(
        name = "orders.service.place_order",
        skip(self, cart, request, discount),
        fields(
            cart_uuid = %cart.uuid,
            gateway = self.gateway.name(),
            order_uuid = tracing::field::Empty,
            order_number = tracing::field::Empty,
            total = tracing::field::Empty
        ),
        err
    )]
    async fn place_order(
        &self,
        cart: Cart,
        request: CheckoutRequest,
        discount: Option<DiscountCode>,
    ) -> Result<PlacedOrder, OrdersServiceError> {
        request.validate()?;

        if cart.is_empty() {
            return Err(OrdersServiceError::EmptyCart);
        }

        let now = Timestamp::now();
        let order_uuid = OrderUuid::new();
        let order_number = generate_order_number(now);

        let span = tracing::Span::current();
        span.record("order_uuid", tracing::field::display(order_uuid));
        span.record("order_number", order_number.as_str());

        let mut tx = self.db.begin().await?;

        let (items, reservations) = self.snapshot_lines(&mut tx, &cart).await?;

        let subtotal =
            pricing::subtotal(items.iter().map(|item| (item.unit_price, item.quantity)))?;

        let discount_amount = match &discount {
            Some(code) => code.rule.amount_for(subtotal, now)?,
            None => 0,
        };

        let totals = Totals::compute(
            subtotal,
            discount_amount,
            self.settings.tax_policy.as_ref(),
            &self.settings.currency,
        )?;

        span.record("total", totals.total);

        let billing_address = request.billing_address().clone();

        let order = NewOrder {
            uuid: order_uuid,
            order_number,
            customer_email: request.email.trim().to_string(),
            customer_name: request.name.trim().to_string(),
            payment_method: request.payment_method,
            payment_gateway: self.gateway.name().to_string(),
            totals,
            currency: self.settings.currency.clone(),
            discount_code: discount.as_ref().map(|code| code.code.clone()),
            shipping_address: request.shipping_address,
            billing_address,
            notes: request.notes,
        };

        self.repository.create_order(&mut tx, &order).await?;
        self.repository
            .create_order_items(&mut tx, order_uuid, &items)
            .await?;

        let intent = match self.open_intent(&order, &items).await {
            Ok(intent) => intent,
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(error = %rollback_error, "checkout rollback failed");
                }

                self.notifier.notify(NotificationEvent::PaymentFailed {
                    order_uuid: None,
                    order_number: order.order_number,
                    reason: failure_reason(&error),
                });

                return Err(error);
            }
        };

        let committed = match self.commit_order(tx, order_uuid, &intent.id).await {
            Ok(committed) => committed,
            Err(error) => {
                if let Err(cancel_error) = self.gateway.cancel_payment(&intent.id).await {
                    tracing::error!(
                        intent_id = %intent.id,
                        error = %cancel_error,
                        "could not cancel payment intent after failed commit"
                    );
                }

                return Err(error);
            }
        };

        if let Some(code) = &discount
            && let Err(error) = self.record_discount_usage(code).await
        {
            tracing::warn!(code = %code.code, %error, "could not record discount usage");
        }

        self.notify_placed(&committed, &reservations);

        Ok(PlacedOrder {
            order: committed,
            intent,
        })
    }

    /// Price every line at live catalog prices and reserve variant stock.
    async fn snapshot_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: &Cart,
    ) -> Result<(Vec<NewOrderItem>, Vec<Reservation>), OrdersServiceError> {
        let mut items = Vec::with_capacity(cart.items.len());
        let mut reservations = Vec::new();

        for (position, line) in cart.items.iter().enumerate() {
            let product = self
                .catalog
                .get_product(tx, line.product_uuid)
                .await
                .map_err(catalog_error)?;

            let (unit_price, variant_name, sku, variant_uuid) = match line.variant_uuid {
                Some(variant) => {
                    let variant = self
                        .catalog
                        .get_variant(tx, product.uuid, variant)
                        .await
                        .map_err(catalog_error)?;

                    let unit_price = variant
                        .unit_price(&product)
                        .ok_or(OrdersServiceError::InvalidData)?;

                    let remaining = self.ledger.reserve(tx, variant.uuid, line.quantity).await?;

                    reservations.push(Reservation {
                        variant: variant.uuid,
                        sku: variant.sku.clone(),
                        remaining,
                    });

                    (unit_price, Some(variant.name), variant.sku, Some(variant.uuid))
                }
                None => (product.base_price, None, product.sku.clone(), None),
            };

            items.push(NewOrderItem {
                uuid: OrderItemUuid::new(),
                position: u32::try_from(position).map_err(|_| OrdersServiceError::InvalidData)?,
                product_uuid: product.uuid,
                variant_uuid,
                product_name: product.title.clone(),
                variant_name,
                sku,
                quantity: line.quantity,
                unit_price,
                total_price: line_total(unit_price, line.quantity)?,
            });
        }

        Ok((items, reservations))
    }

    async fn open_intent(
        &self,
        order: &NewOrder,
        items: &[NewOrderItem],
    ) -> Result<PaymentIntent, OrdersServiceError> {
        let amount = i64::try_from(order.totals.total).map_err(|_| MoneyError::Overflow)?;

        validate_amount(self.gateway.as_ref(), amount).map_err(OrdersServiceError::from_gateway)?;

        let request = CreatePaymentIntent {
            amount: order.totals.total,
            currency: order.currency.clone(),
            customer_ref: order.customer_email.clone(),
            description: format!("Order {}", order.order_number),
            line_items: items
                .iter()
                .map(|item| PaymentLineItem {
                    name: item.product_name.clone(),
                    sku: item.sku.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            metadata: BTreeMap::from([
                ("order_uuid".to_string(), order.uuid.to_string()),
                ("order_number".to_string(), order.order_number.clone()),
            ]),
            idempotency_key: order.uuid.to_string(),
        };

        match tokio::time::timeout(
            self.settings.gateway_timeout,
            self.gateway.create_payment_intent(request),
        )
        .await
        {
            Ok(result) => result.map_err(OrdersServiceError::from_gateway),
            Err(_elapsed) => Err(OrdersServiceError::PaymentFailed(
                PaymentGatewayError::Timeout,
            )),
        }
    }

    async fn commit_order(
        &self,
        mut tx: Transaction<'static, Postgres>,
        order: OrderUuid,
        intent_id: &str,
    ) -> Result<Order, OrdersServiceError> {
        self.repository
            .set_payment_intent(&mut tx, order, intent_id)
            .await?;

        let order = self.repository.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn record_discount_usage(&self, code: &DiscountCode) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin().await?;

        self.discounts.record_usage(&mut tx, code.uuid).await?;

        tx.commit().await
    }

    fn notify_placed(&self, order: &Order, reservations: &[Reservation]) {
        self.notifier.notify(NotificationEvent::OrderCreated {
            order_uuid: order.uuid,
            order_number: order.order_number.clone(),
            total: order.total,
            currency: order.currency.clone(),
        });

        for reservation in reservations
            .iter()
            .filter(|reservation| reservation.remaining <= self.settings.low_stock_threshold)
        {
            self.notifier.notify(NotificationEvent::LowStock {
                variant_uuid: reservation.variant,
                sku: reservation.sku.clone(),
                stock: reservation.remaining,
            });
        }
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    async fn create_order(
        &self,
        cart: Cart,
        request: CheckoutRequest,
        discount: Option<DiscountCode>,
    ) -> Result<PlacedOrder, OrdersServiceError> {
        let service = self.clone();

        // Detached so a caller that goes away cannot strand an open intent mid-checkout.
        tokio::spawn(
            async move { service.place_order(cart, request, discount).await }.in_current_span(),
        )
        .await
        .map_err(|error| {
            tracing::error!(%error, "checkout task did not complete");

            OrdersServiceError::Interrupted
        })?
    }

    async fn get_order(&self, order: OrderUuid) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.repository.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<OrderPage, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let (orders, total) = self.repository.list_orders(&mut tx, &filter).await?;

        tx.commit().await?;

        Ok(OrderPage {
            orders,
            total,
            page: filter.page(),
            per_page: filter.per_page(),
        })
    }

    #[tracing::instrument(
        name = "orders.service.update_fulfillment_status",
        skip(self),
        fields(order_uuid = %order, status = %status),
        err
    )]
    async fn update_fulfillment_status(
        &self,
        order: OrderUuid,
        status: FulfillmentStatus,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .repository
            .update_fulfillment_status(&mut tx, order, status)
            .await?;

        if rows_affected == 0 {
            return Err(OrdersServiceError::OrderNotFound);
        }

        let order = self.repository.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Turn a loaded cart into a pending order with an open payment intent.
    ///
    /// Either everything commits (order, items, stock reservations, intent id) or nothing does.
    async fn create_order(
        &self,
        cart: Cart,
        request: CheckoutRequest,
        discount: Option<DiscountCode>,
    ) -> Result<PlacedOrder, OrdersServiceError>;

    /// Retrieve an order with its items.
    async fn get_order(&self, order: OrderUuid) -> Result<Order, OrdersServiceError>;

    /// List orders, newest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<OrderPage, OrdersServiceError>;

    /// Move an order along the fulfillment axis; payment status is untouched.
    async fn update_fulfillment_status(
        &self,
        order: OrderUuid,
        status: FulfillmentStatus,
    ) -> Result<Order, OrdersServiceError>;
}

fn catalog_error(error: sqlx::Error) -> OrdersServiceError {
    match error {
        sqlx::Error::RowNotFound => OrdersServiceError::ProductNotFound,
        other => OrdersServiceError::from(other),
    }
}

fn failure_reason(error: &OrdersServiceError) -> String {
    match error {
        OrdersServiceError::PaymentValidationFailed(source)
        | OrdersServiceError::PaymentFailed(source) => source.to_string(),
        other => other.to_string(),
    }
}
