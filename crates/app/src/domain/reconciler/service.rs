//! Reconciler service.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use atelier::status::{PaymentEvent, PaymentStatus, Transition};
use mockall::automock;
use sqlx::{Postgres, Transaction};

use crate::{
    database::Db,
    domain::{
        inventory::PgInventoryLedger,
        orders::{
            PgOrdersRepository,
            models::{Order, OrderUuid},
        },
        reconciler::{
            errors::ReconcilerError,
            events::{ReconcileOutcome, WebhookAction, WebhookEvent},
            repository::PgWebhookEventsRepository,
        },
    },
    notifications::{NotificationEvent, Notifier},
    payments::{PaymentGateway, PaymentGatewayError, RefundRequest},
};

/// A provider delivery that passed signature checks, or a direct verdict with no delivery id.
struct Delivery<'a> {
    key: String,
    event_type: &'a str,
}

#[derive(Clone)]
pub struct PgReconcilerService {
    db: Db,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    gateway_timeout: Duration,
    orders: PgOrdersRepository,
    ledger: PgInventoryLedger,
    events: PgWebhookEventsRepository,
}

impl PgReconcilerService {
    #[must_use]
    pub fn new(
        db: Db,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            db,
            gateway,
            notifier,
            gateway_timeout,
            orders: PgOrdersRepository::new(),
            ledger: PgInventoryLedger::new(),
            events: PgWebhookEventsRepository::new(),
        }
    }

    #[tracing::instrument(
        name = "reconciler.service.reconcile",
        skip(self, delivery, reason),
        fields(order_uuid = tracing::field::Empty),
        err
    )]
    async fn reconcile(
        &self,
        delivery: Option<Delivery<'_>>,
        intent_id: &str,
        event: PaymentEvent,
        reason: Option<&str>,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let mut tx = self.db.begin().await?;

        if let Some(delivery) = &delivery {
            let first_delivery = self
                .events
                .record_event(&mut tx, &delivery.key, delivery.event_type, intent_id)
                .await?;

            if !first_delivery {
                tx.rollback().await?;

                return Ok(ReconcileOutcome::Duplicate);
            }
        }

        let Some(order) = self
            .orders
            .lock_order_by_payment_intent(&mut tx, intent_id)
            .await?
        else {
            tracing::warn!(intent_id, "payment event for unknown intent");

            // The delivery is not remembered: a redelivery after checkout commits must apply.
            tx.rollback().await?;

            return Ok(ReconcileOutcome::UnknownIntent);
        };

        tracing::Span::current().record("order_uuid", tracing::field::display(order.uuid));

        let status = match order.payment_status.apply(event) {
            Transition::To(status) => status,
            Transition::AlreadyApplied => {
                tx.commit().await?;

                return Ok(ReconcileOutcome::AlreadyApplied);
            }
            Transition::NotAllowed => {
                tracing::warn!(
                    current = %order.payment_status,
                    ?event,
                    "payment event does not apply to order; needs manual follow-up"
                );

                tx.commit().await?;

                return Ok(ReconcileOutcome::NotAllowed);
            }
        };

        if !status.holds_stock() {
            self.release_stock(&mut tx, &order).await?;
        }

        self.orders
            .update_payment_status(&mut tx, order.uuid, status, reason)
            .await?;

        tx.commit().await?;

        match status {
            PaymentStatus::Paid => self.notifier.notify(NotificationEvent::OrderPaid {
                order_uuid: order.uuid,
                order_number: order.order_number,
                total: order.total,
                currency: order.currency,
            }),
            PaymentStatus::Failed => self.notifier.notify(NotificationEvent::PaymentFailed {
                order_uuid: Some(order.uuid),
                order_number: order.order_number,
                reason: reason.unwrap_or_default().to_string(),
            }),
            PaymentStatus::Pending | PaymentStatus::Refunded => {}
        }

        Ok(ReconcileOutcome::Applied(status))
    }

    /// Return every reserved unit of `order` to stock.
    async fn release_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<(), ReconcilerError> {
        for item in &order.items {
            if let Some(variant) = item.variant_uuid {
                self.ledger.release(tx, variant, item.quantity).await?;
            }
        }

        Ok(())
    }

    async fn refund_at_gateway(&self, request: RefundRequest) -> Result<u64, ReconcilerError> {
        let refund = tokio::time::timeout(self.gateway_timeout, self.gateway.refund(request))
            .await
            .map_err(|_elapsed| ReconcilerError::RefundFailed(PaymentGatewayError::Timeout))?
            .map_err(ReconcilerError::RefundFailed)?;

        tracing::info!(refund_id = %refund.refund_id, amount = refund.amount, "refund accepted");

        Ok(refund.amount)
    }
}

#[async_trait]
impl ReconcilerService for PgReconcilerService {
    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, ReconcilerError> {
        if self.gateway.signs_webhooks() {
            self.gateway
                .verify_webhook_signature(payload, signature)
                .map_err(ReconcilerError::InvalidSignature)?;
        }

        Ok(WebhookEvent::parse(payload)?)
    }

    #[tracing::instrument(
        name = "reconciler.service.handle_event",
        skip(self, event),
        fields(event_id = %event.id, event_type = %event.event_type, intent_id = %event.intent_id()),
        err
    )]
    async fn handle_event(&self, event: WebhookEvent) -> Result<ReconcileOutcome, ReconcilerError> {
        let delivery = Delivery {
            key: event.dedupe_key(),
            event_type: &event.event_type,
        };

        match event.action() {
            WebhookAction::Succeeded { intent_id } => {
                self.reconcile(Some(delivery), intent_id, PaymentEvent::Succeeded, None)
                    .await
            }
            WebhookAction::Failed { intent_id, reason } => {
                self.reconcile(
                    Some(delivery),
                    intent_id,
                    PaymentEvent::Failed,
                    Some(&reason),
                )
                .await
            }
            WebhookAction::Ignored => Ok(ReconcileOutcome::Ignored),
        }
    }

    async fn handle_payment_success(
        &self,
        intent_id: &str,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        self.reconcile(None, intent_id, PaymentEvent::Succeeded, None)
            .await
    }

    async fn handle_payment_failed(
        &self,
        intent_id: &str,
        reason: &str,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        self.reconcile(None, intent_id, PaymentEvent::Failed, Some(reason))
            .await
    }

    #[tracing::instrument(
        name = "reconciler.service.refund_order",
        skip(self),
        fields(order_uuid = %order, gateway = self.gateway.name()),
        err
    )]
    async fn refund_order(
        &self,
        order: OrderUuid,
        amount: Option<u64>,
    ) -> Result<Order, ReconcilerError> {
        // The row lock is held across the gateway call so concurrent refunds of the same order
        // queue behind each other and only the first one reaches the gateway.
        let mut tx = self.db.begin().await?;
        let current = self.orders.lock_order(&mut tx, order).await?;

        if !matches!(
            current.payment_status.apply(PaymentEvent::Refunded),
            Transition::To(_)
        ) {
            return Err(ReconcilerError::NotRefundable(current.payment_status));
        }

        if amount.is_some_and(|amount| amount == 0 || amount > current.total) {
            return Err(ReconcilerError::InvalidRefundAmount);
        }

        let intent_id = current
            .payment_intent_id
            .clone()
            .ok_or(ReconcilerError::NotRefundable(current.payment_status))?;

        let refunded = self
            .refund_at_gateway(RefundRequest {
                intent_id,
                amount,
                idempotency_key: refund_idempotency_key(order),
            })
            .await?;

        self.release_stock(&mut tx, &current).await?;
        self.orders.record_refund(&mut tx, order, refunded).await?;

        let refunded_order = self.orders.get_order(&mut tx, order).await?;

        if let Err(error) = tx.commit().await {
            tracing::error!(
                %error,
                refunded,
                "gateway refunded the order but it could not be recorded; needs manual follow-up"
            );

            return Err(error.into());
        }

        self.notifier.notify(NotificationEvent::OrderRefunded {
            order_uuid: refunded_order.uuid,
            order_number: refunded_order.order_number.clone(),
            amount: refunded,
            currency: refunded_order.currency.clone(),
        });

        Ok(refunded_order)
    }
}

/// An order is refunded at most once, so its uuid keys the gateway refund.
fn refund_idempotency_key(order: OrderUuid) -> String {
    format!("refund-{order}")
}

#[automock]
#[async_trait]
pub trait ReconcilerService: Send + Sync {
    /// Verify a raw webhook body (when the gateway signs them) and parse it.
    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, ReconcilerError>;

    /// Apply a parsed provider event exactly once.
    async fn handle_event(&self, event: WebhookEvent) -> Result<ReconcileOutcome, ReconcilerError>;

    /// Mark the order paid through `intent_id` as paid.
    async fn handle_payment_success(
        &self,
        intent_id: &str,
    ) -> Result<ReconcileOutcome, ReconcilerError>;

    /// Mark the order paid through `intent_id` as failed and release its stock.
    async fn handle_payment_failed(
        &self,
        intent_id: &str,
        reason: &str,
    ) -> Result<ReconcileOutcome, ReconcilerError>;

    /// Refund a paid order, fully when `amount` is `None`.
    ///
    /// A refund the gateway refuses leaves the order paid.
    async fn refund_order(
        &self,
        order: OrderUuid,
        amount: Option<u64>,
    ) -> Result<Order, ReconcilerError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use crate::{
        domain::{
            inventory::InventoryService,
            orders::{OrderSettings, OrdersService, PgOrdersService},
        },
        payments::{
            MockPaymentGateway,
            marketplace::{MarketplaceConfig, MarketplaceRedirectGateway},
        },
        test::{RecordingNotifier, TestContext, helpers},
    };

    use super::*;

    fn event(
        event_id: &str,
        event_type: &str,
        intent_id: &str,
    ) -> Result<WebhookEvent, ReconcilerError> {
        let payload = json!({
            "id": event_id,
            "type": event_type,
            "data": {
                "object": {
                    "id": intent_id,
                    "status": "requires_payment_method",
                    "last_payment_error": { "message": "insufficient funds" }
                }
            }
        });

        Ok(WebhookEvent::parse(&serde_json::to_vec(&payload)?)?)
    }

    #[tokio::test]
    async fn succeeded_event_marks_order_paid_once() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, variant) = helpers::place_order(&ctx, 1_500, 5, 3).await?;

        let delivery = event("evt_1", "payment_intent.succeeded", &placed.intent.id)?;

        let first = ctx.reconciler.handle_event(delivery.clone()).await?;
        let second = ctx.reconciler.handle_event(delivery).await?;

        assert_eq!(first, ReconcileOutcome::Applied(PaymentStatus::Paid));
        assert_eq!(second, ReconcileOutcome::Duplicate);

        let order = ctx.orders.get_order(placed.order.uuid).await?;

        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 2);

        let paid_events = ctx
            .notifications
            .events()
            .into_iter()
            .filter(|event| matches!(event, NotificationEvent::OrderPaid { .. }))
            .count();

        assert_eq!(paid_events, 1, "OrderPaid fires once per transition");

        Ok(())
    }

    #[tokio::test]
    async fn redelivery_under_a_new_event_id_is_already_applied() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, _) = helpers::place_order(&ctx, 1_500, 5, 1).await?;

        ctx.reconciler
            .handle_event(event("evt_1", "payment_intent.succeeded", &placed.intent.id)?)
            .await?;

        let outcome = ctx
            .reconciler
            .handle_event(event("evt_2", "payment_intent.succeeded", &placed.intent.id)?)
            .await?;

        assert_eq!(outcome, ReconcileOutcome::AlreadyApplied);

        let outcome = ctx
            .reconciler
            .handle_payment_success(&placed.intent.id)
            .await?;

        assert_eq!(outcome, ReconcileOutcome::AlreadyApplied);

        Ok(())
    }

    #[tokio::test]
    async fn failed_event_releases_reserved_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, variant) = helpers::place_order(&ctx, 1_500, 5, 3).await?;

        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 2);

        let outcome = ctx
            .reconciler
            .handle_event(event("evt_1", "payment_intent.payment_failed", &placed.intent.id)?)
            .await?;

        assert_eq!(outcome, ReconcileOutcome::Applied(PaymentStatus::Failed));

        let order = ctx.orders.get_order(placed.order.uuid).await?;

        assert_eq!(order.payment_status, PaymentStatus::Failed);
        assert_eq!(
            order.payment_failure_reason.as_deref(),
            Some("insufficient funds")
        );
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 5);

        // a late success cannot revive a failed order or release twice
        let late = ctx.reconciler.handle_payment_success(&placed.intent.id).await?;
        let repeat = ctx
            .reconciler
            .handle_payment_failed(&placed.intent.id, "declined again")
            .await?;

        assert_eq!(late, ReconcileOutcome::NotAllowed);
        assert_eq!(repeat, ReconcileOutcome::AlreadyApplied);
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_intent_and_other_types_change_nothing() -> TestResult {
        let ctx = TestContext::new().await;

        let unknown = ctx
            .reconciler
            .handle_event(event("evt_1", "payment_intent.succeeded", "pi_nobody")?)
            .await?;

        let ignored = ctx
            .reconciler
            .handle_event(event("evt_2", "charge.dispute.created", "dp_1")?)
            .await?;

        assert_eq!(unknown, ReconcileOutcome::UnknownIntent);
        assert_eq!(ignored, ReconcileOutcome::Ignored);

        Ok(())
    }

    #[tokio::test]
    async fn refund_of_paid_order_restores_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, variant) = helpers::place_order(&ctx, 1_500, 5, 3).await?;

        ctx.reconciler
            .handle_payment_success(&placed.intent.id)
            .await?;

        let refunded = ctx.reconciler.refund_order(placed.order.uuid, None).await?;

        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert_eq!(refunded.refunded_amount, 4_500);
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 5);
        assert!(
            ctx.notifications.events().iter().any(|event| matches!(
                event,
                NotificationEvent::OrderRefunded { amount: 4_500, .. }
            )),
            "expected an OrderRefunded event"
        );

        let again = ctx.reconciler.refund_order(placed.order.uuid, None).await;

        assert!(
            matches!(again, Err(ReconcilerError::NotRefundable(PaymentStatus::Refunded))),
            "expected NotRefundable, got {again:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn partial_refund_records_the_refunded_amount() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, _) = helpers::place_order(&ctx, 1_500, 5, 2).await?;

        ctx.reconciler
            .handle_payment_success(&placed.intent.id)
            .await?;

        let too_much = ctx
            .reconciler
            .refund_order(placed.order.uuid, Some(3_001))
            .await;

        assert!(
            matches!(too_much, Err(ReconcilerError::InvalidRefundAmount)),
            "expected InvalidRefundAmount, got {too_much:?}"
        );

        let refunded = ctx
            .reconciler
            .refund_order(placed.order.uuid, Some(1_000))
            .await?;

        assert_eq!(refunded.refunded_amount, 1_000);
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

        Ok(())
    }

    #[tokio::test]
    async fn refund_of_pending_order_is_not_allowed() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, _) = helpers::place_order(&ctx, 1_500, 5, 1).await?;

        let result = ctx.reconciler.refund_order(placed.order.uuid, None).await;

        assert!(
            matches!(result, Err(ReconcilerError::NotRefundable(PaymentStatus::Pending))),
            "expected NotRefundable, got {result:?}"
        );

        let result = ctx.reconciler.refund_order(OrderUuid::new(), None).await;

        assert!(
            matches!(result, Err(ReconcilerError::OrderNotFound)),
            "expected OrderNotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn marketplace_refund_fails_and_order_stays_paid() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, 1_500).await?;
        let variant = helpers::create_variant(&ctx, &product, 0, 5).await?;

        let db = Db::new(ctx.db.pool().clone());
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(MarketplaceRedirectGateway::new(MarketplaceConfig {
                shop_url: "https://shop.example.com/checkout".to_string(),
                callback_url: None,
            })?);
        let notifier = Arc::new(RecordingNotifier::default());

        let orders = PgOrdersService::new(
            db.clone(),
            OrderSettings::default(),
            gateway.clone(),
            notifier.clone(),
        );
        let reconciler = PgReconcilerService::new(db, gateway, notifier, Duration::from_secs(5));

        let cart = helpers::cart_with(&ctx, &[(product.uuid, Some(variant.uuid), 2)]).await?;
        let placed = orders
            .create_order(cart, helpers::checkout_request(), None)
            .await?;

        reconciler.handle_payment_success(&placed.intent.id).await?;

        let result = reconciler.refund_order(placed.order.uuid, None).await;

        assert!(
            matches!(
                result,
                Err(ReconcilerError::RefundFailed(
                    PaymentGatewayError::ManualActionRequired(_)
                ))
            ),
            "expected RefundFailed, got {result:?}"
        );

        let order = orders.get_order(placed.order.uuid).await?;

        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.refunded_amount, 0);
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 3);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_deliveries_apply_once() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, variant) = helpers::place_order(&ctx, 1_500, 5, 3).await?;

        let delivery = event("evt_1", "payment_intent.payment_failed", &placed.intent.id)?;

        let (first, second) = tokio::join!(
            ctx.reconciler.handle_event(delivery.clone()),
            ctx.reconciler.handle_event(delivery),
        );

        let mut outcomes = vec![first?, second?];
        outcomes.sort_by_key(|outcome| outcome.as_str());

        assert_eq!(
            outcomes,
            vec![
                ReconcileOutcome::Duplicate,
                ReconcileOutcome::Applied(PaymentStatus::Failed)
            ]
        );
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_refunds_pay_out_once() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, variant) = helpers::place_order(&ctx, 1_500, 5, 2).await?;

        ctx.reconciler
            .handle_payment_success(&placed.intent.id)
            .await?;

        // keep the first refund inside the gateway while the second one arrives
        ctx.gateway.set_latency(Some(Duration::from_millis(200)));

        let (first, second) = tokio::join!(
            ctx.reconciler.refund_order(placed.order.uuid, None),
            ctx.reconciler.refund_order(placed.order.uuid, None),
        );

        let (refunded, rejected) = match (first, second) {
            (Ok(order), Err(error)) | (Err(error), Ok(order)) => (order, error),
            other => panic!("expected one refund to win, got {other:?}"),
        };

        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert_eq!(refunded.refunded_amount, 3_000);
        assert!(
            matches!(rejected, ReconcilerError::NotRefundable(PaymentStatus::Refunded)),
            "expected NotRefundable, got {rejected:?}"
        );
        assert_eq!(ctx.gateway.refund_count(), 1);
        assert_eq!(ctx.inventory.stock_level(variant.uuid).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn early_event_applies_once_the_order_exists() -> TestResult {
        let ctx = TestContext::new().await;
        let (placed, _) = helpers::place_order(&ctx, 1_500, 5, 1).await?;

        let delivery = event("evt_early", "payment_intent.succeeded", "pi_early")?;

        let early = ctx.reconciler.handle_event(delivery.clone()).await?;

        assert_eq!(early, ReconcileOutcome::UnknownIntent);

        // the checkout that owns the intent commits after the first delivery
        sqlx::query("UPDATE orders SET payment_intent_id = 'pi_early' WHERE uuid = $1")
            .bind(placed.order.uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let redelivered = ctx.reconciler.handle_event(delivery).await?;

        assert_eq!(redelivered, ReconcileOutcome::Applied(PaymentStatus::Paid));

        let order = ctx.orders.get_order(placed.order.uuid).await?;

        assert_eq!(order.payment_status, PaymentStatus::Paid);

        Ok(())
    }

    #[tokio::test]
    async fn signed_webhooks_are_verified_before_parsing() {
        let ctx = TestContext::new().await;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_signs_webhooks().return_const(true);
        gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Err(PaymentGatewayError::InvalidSignature("mismatch")));

        let reconciler = PgReconcilerService::new(
            Db::new(ctx.db.pool().clone()),
            Arc::new(gateway),
            Arc::new(RecordingNotifier::default()),
            Duration::from_secs(5),
        );

        let result = reconciler.parse_webhook(b"{}", "t=1,v1=00");

        assert!(
            matches!(result, Err(ReconcilerError::InvalidSignature(_))),
            "expected InvalidSignature, got {result:?}"
        );
    }

    #[tokio::test]
    async fn unsigned_gateway_rejects_only_malformed_bodies() {
        let ctx = TestContext::new().await;

        let result = ctx.reconciler.parse_webhook(b"not json", "");

        assert!(
            matches!(result, Err(ReconcilerError::MalformedPayload(_))),
            "expected MalformedPayload, got {result:?}"
        );
    }
}
