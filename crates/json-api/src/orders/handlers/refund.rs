//! Refund Order Handler

use salvo::{
    oapi::{
        ToSchema,
        extract::{JsonBody, PathParam},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::orders::models::OrderUuid;

use crate::{
    extensions::*,
    orders::{errors::refund_status_error, models::OrderResponse},
};

/// Refund Order Request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct RefundOrderRequest {
    /// Amount to refund in minor units; the full total when omitted
    #[serde(default)]
    pub amount: Option<u64>,
}

/// Refund Order Handler
///
/// Refunds a paid order through its gateway and restores its reserved stock. A refund the
/// gateway rejects leaves the order paid.
#[endpoint(
    tags("admin"),
    summary = "Refund Order",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Order refunded"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid refund amount"),
        (status_code = StatusCode::NOT_FOUND, description = "Order not found"),
        (status_code = StatusCode::CONFLICT, description = "Order is not paid"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Refund requires manual processing"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Gateway rejected the refund"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "orders.refund",
    skip(order, json, depot),
    fields(order_uuid = tracing::field::Empty, amount = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    json: JsonBody<RefundOrderRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.state()?;
    let order = OrderUuid::from_uuid(order.into_inner());
    let amount = json.into_inner().amount;

    let span = tracing::Span::current();
    span.record("order_uuid", tracing::field::display(order));
    if let Some(amount) = amount {
        span.record("amount", amount);
    }

    let refunded = state
        .app
        .reconciler
        .refund_order(order, amount)
        .await
        .map_err(refund_status_error)?;

    tracing::info!(
        order_uuid = %order,
        refunded_amount = refunded.refunded_amount,
        "refunded order"
    );

    Ok(Json(refunded.into()))
}
