//! Update Fulfillment Handler

use atelier::status::FulfillmentStatus;
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
    orders::{errors::into_status_error, models::OrderResponse},
};

/// Update Fulfillment Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdateFulfillmentRequest {
    /// `unfulfilled`, `partially_fulfilled` or `fulfilled`
    pub status: String,
}

/// Update Fulfillment Handler
///
/// Fulfillment moves independently of payment status.
#[endpoint(
    tags("admin"),
    summary = "Update Order Fulfillment",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Fulfillment updated"),
        (status_code = StatusCode::BAD_REQUEST, description = "Unknown fulfillment status"),
        (status_code = StatusCode::NOT_FOUND, description = "Order not found"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "orders.fulfillment",
    skip(order, json, depot),
    fields(order_uuid = tracing::field::Empty, status = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    json: JsonBody<UpdateFulfillmentRequest>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.state()?;
    let order = OrderUuid::from_uuid(order.into_inner());

    let status = json
        .into_inner()
        .status
        .parse::<FulfillmentStatus>()
        .or_400("Unknown fulfillment status")?;

    let span = tracing::Span::current();
    span.record("order_uuid", tracing::field::display(order));
    span.record("status", tracing::field::display(status));

    let order = state
        .app
        .orders
        .update_fulfillment_status(order, status)
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}

#[cfg(test)]
mod tests {
    use atelier::status::PaymentStatus;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use atelier_app::domain::orders::{MockOrdersService, OrdersServiceError};

    use crate::{orders::handlers::tests::orders_service, test_helpers::make_order};

    use super::*;

    fn make_service(orders: MockOrdersService) -> Service {
        orders_service(
            orders,
            Router::with_path("admin/orders/{order}/fulfillment").put(handler),
        )
    }

    #[tokio::test]
    async fn test_update_fulfillment_success() -> TestResult {
        let mut order = make_order(PaymentStatus::Paid);
        order.fulfillment_status = FulfillmentStatus::Fulfilled;
        let uuid = order.uuid;

        let mut orders = MockOrdersService::new();

        orders
            .expect_update_fulfillment_status()
            .once()
            .withf(move |o, status| *o == uuid && *status == FulfillmentStatus::Fulfilled)
            .return_once(move |_, _| Ok(order));

        let mut res = TestClient::put(format!("http://example.com/admin/orders/{uuid}/fulfillment"))
            .json(&json!({ "status": "fulfilled" }))
            .send(&make_service(orders))
            .await;

        let body: OrderResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.fulfillment_status, "fulfilled");
        assert_eq!(body.payment_status, "paid");

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_fulfillment_status_is_400() -> TestResult {
        let mut orders = MockOrdersService::new();

        orders.expect_update_fulfillment_status().never();

        let res = TestClient::put(format!(
            "http://example.com/admin/orders/{}/fulfillment",
            Uuid::now_v7()
        ))
        .json(&json!({ "status": "shipped" }))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_fulfillment_of_unknown_order_is_404() -> TestResult {
        let mut orders = MockOrdersService::new();

        orders
            .expect_update_fulfillment_status()
            .once()
            .return_once(|_, _| Err(OrdersServiceError::OrderNotFound));

        let res = TestClient::put(format!(
            "http://example.com/admin/orders/{}/fulfillment",
            Uuid::now_v7()
        ))
        .json(&json!({ "status": "partially_fulfilled" }))
        .send(&make_service(orders))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
