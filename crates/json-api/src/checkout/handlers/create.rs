//! Checkout Handler

use salvo::{
    http::header::LOCATION,
    oapi::extract::JsonBody,
    prelude::*,
};
use tracing::info;

use atelier_app::domain::orders::models::PaymentMethod;

use crate::{
    carts::session::session_token,
    checkout::{
        errors::{into_status_error, outcome},
        models::{CheckoutBody, OrderPlacedResponse},
    },
    extensions::*,
    observability::record_checkout,
};

/// Checkout Handler
///
/// Places an order for the caller's cart and opens a payment intent for its total.
#[endpoint(
    tags("checkout"),
    summary = "Checkout",
    responses(
        (status_code = StatusCode::CREATED, description = "Order placed, awaiting payment"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid buyer details or empty cart"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart, product or discount code not found"),
        (status_code = StatusCode::CONFLICT, description = "Not enough stock"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Discount code or payment amount rejected"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Payment provider failed"),
        (status_code = StatusCode::SERVICE_UNAVAILABLE, description = "Checkout interrupted"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<CheckoutBody>,
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<OrderPlacedResponse>, StatusError> {
    let state = depot.state()?;
    let body = json.into_inner();

    let payment_method = body
        .payment_method
        .parse::<PaymentMethod>()
        .or_400("Unsupported payment method")?;

    let (request, discount_code, body_token) = body.into_parts(payment_method);

    let token = body_token
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| session_token(req))
        .ok_or_else(|| StatusError::not_found().brief("Cart not found"))?;

    let result = state
        .app
        .checkout
        .checkout(&token, request, discount_code)
        .await;

    record_checkout(outcome(result.as_ref().map(|_| ())));

    let placed = result.map_err(into_status_error)?;

    info!(
        order = %placed.order.uuid,
        order_number = %placed.order.order_number,
        total = placed.order.total,
        "order placed"
    );

    res.add_header(LOCATION, format!("/admin/orders/{}", placed.order.uuid), true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::CREATED);

    Ok(Json(placed.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use atelier::status::PaymentStatus;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::{Value, json};
    use testresult::TestResult;

    use atelier_app::{
        context::AppContext,
        domain::{
            carts::CartsServiceError,
            checkout::{CheckoutError, MockCheckoutService},
            orders::{OrdersServiceError, models::PlacedOrder},
        },
        payments::{PaymentGatewayError, PaymentIntent, PaymentIntentStatus},
    };

    use crate::{
        carts::session::SESSION_HEADER,
        test_helpers::{TEST_SESSION, app_context, make_order, service},
    };

    use super::*;

    fn make_service(checkout: MockCheckoutService) -> Service {
        service(
            AppContext {
                checkout: Arc::new(checkout),
                ..app_context()
            },
            Router::with_path("checkout").post(handler),
        )
    }

    fn body() -> Value {
        json!({
            "email": "buyer@example.com",
            "name": "Ada Buyer",
            "payment_method": "credit_card",
            "shipping_address": {
                "street": "12 Rue des Arts",
                "city": "Lyon",
                "postal_code": "69001",
                "country": "FR"
            },
            "discount_code": " spring10 "
        })
    }

    fn placed() -> PlacedOrder {
        let order = make_order(PaymentStatus::Pending);

        PlacedOrder {
            intent: PaymentIntent {
                id: "mock_pi_1".to_string(),
                amount: order.total,
                currency: order.currency.clone(),
                client_secret: "mock_pi_1_secret".to_string(),
                status: PaymentIntentStatus::RequiresPayment,
            },
            order,
        }
    }

    #[tokio::test]
    async fn test_checkout_success() -> TestResult {
        let placed = placed();
        let uuid = placed.order.uuid;

        let mut checkout = MockCheckoutService::new();

        checkout
            .expect_checkout()
            .once()
            .withf(|token, request, code| {
                token == TEST_SESSION
                    && request.payment_method == PaymentMethod::CreditCard
                    && request.billing_address.is_none()
                    && code.as_deref() == Some("spring10")
            })
            .return_once(move |_, _, _| Ok(placed));

        let mut res = TestClient::post("http://example.com/checkout")
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .json(&body())
            .send(&make_service(checkout))
            .await;

        let location = res
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: OrderPlacedResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::CREATED));
        assert_eq!(location, Some(format!("/admin/orders/{uuid}")));
        assert_eq!(body.order_uuid, uuid.into_uuid());
        assert_eq!(body.payment_intent_id, "mock_pi_1");
        assert_eq!(body.client_secret, "mock_pi_1_secret");
        assert_eq!(body.total, 3_000);
        assert_eq!(body.payment_status, "pending");

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_takes_session_from_body() -> TestResult {
        let placed = placed();

        let mut checkout = MockCheckoutService::new();

        checkout
            .expect_checkout()
            .once()
            .withf(|token, _, _| token == "body-token")
            .return_once(move |_, _, _| Ok(placed));

        let mut payload = body();
        payload["session_token"] = json!("body-token");

        let res = TestClient::post("http://example.com/checkout")
            .json(&payload)
            .send(&make_service(checkout))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CREATED));

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_without_session_is_404() -> TestResult {
        let mut checkout = MockCheckoutService::new();

        checkout.expect_checkout().never();

        let res = TestClient::post("http://example.com/checkout")
            .json(&body())
            .send(&make_service(checkout))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_unknown_payment_method_is_400() -> TestResult {
        let mut checkout = MockCheckoutService::new();

        checkout.expect_checkout().never();

        let mut payload = body();
        payload["payment_method"] = json!("cash");

        let res = TestClient::post("http://example.com/checkout")
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .json(&payload)
            .send(&make_service(checkout))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_is_400() -> TestResult {
        let mut checkout = MockCheckoutService::new();

        checkout
            .expect_checkout()
            .once()
            .return_once(|_, _, _| Err(CheckoutError::Order(OrdersServiceError::EmptyCart)));

        let res = TestClient::post("http://example.com/checkout")
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .json(&body())
            .send(&make_service(checkout))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_expired_cart_is_404() -> TestResult {
        let mut checkout = MockCheckoutService::new();

        checkout
            .expect_checkout()
            .once()
            .return_once(|_, _, _| Err(CheckoutError::Cart(CartsServiceError::NotFound)));

        let res = TestClient::post("http://example.com/checkout")
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .json(&body())
            .send(&make_service(checkout))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_gateway_timeout_is_502() -> TestResult {
        let mut checkout = MockCheckoutService::new();

        checkout.expect_checkout().once().return_once(|_, _, _| {
            Err(CheckoutError::Order(OrdersServiceError::PaymentFailed(
                PaymentGatewayError::Timeout,
            )))
        });

        let res = TestClient::post("http://example.com/checkout")
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .json(&body())
            .send(&make_service(checkout))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_GATEWAY));

        Ok(())
    }
}
