//! Preview Discount Handler

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use atelier_app::domain::discounts::models::DiscountPreview;

use crate::{
    carts::session::session_token_or_404, checkout::errors::into_status_error, extensions::*,
};

/// Preview Discount Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PreviewDiscountRequest {
    /// Code as typed by the buyer; matched case-insensitively
    pub code: String,
}

/// Discount Preview Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct DiscountPreviewResponse {
    /// Normalized code
    pub code: String,

    /// `percentage` or `fixed_amount`
    pub kind: String,

    /// Basis points for percentages, minor units for fixed amounts
    pub value: u64,

    /// What the code takes off, in minor units
    pub discount_amount: u64,

    pub subtotal: u64,

    pub total_before: u64,

    pub total_after: u64,
}

impl From<DiscountPreview> for DiscountPreviewResponse {
    fn from(preview: DiscountPreview) -> Self {
        Self {
            code: preview.code,
            kind: preview.kind.to_string(),
            value: preview.value,
            discount_amount: preview.discount_amount,
            subtotal: preview.subtotal,
            total_before: preview.total_before,
            total_after: preview.total_after,
        }
    }
}

/// Preview Discount Handler
///
/// Prices a code against the cart without redeeming it.
#[endpoint(
    tags("cart"),
    summary = "Preview Discount Code",
    responses(
        (status_code = StatusCode::OK, description = "Discount applies"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart or discount code not found"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Discount code cannot be applied"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<PreviewDiscountRequest>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<DiscountPreviewResponse>, StatusError> {
    let state = depot.state()?;
    let token = session_token_or_404(req)?;
    let code = json.into_inner().code;

    if code.trim().is_empty() {
        return Err(StatusError::bad_request().brief("Discount code is required"));
    }

    let preview = state
        .app
        .checkout
        .preview_discount(&token, &code)
        .await
        .map_err(into_status_error)?;

    Ok(Json(preview.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use atelier::discounts::{DiscountKind, DiscountRejection};
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use atelier_app::{
        context::AppContext,
        domain::{
            checkout::{CheckoutError, MockCheckoutService},
            discounts::DiscountsServiceError,
        },
    };

    use crate::{
        carts::session::SESSION_HEADER,
        test_helpers::{TEST_SESSION, app_context, service},
    };

    use super::*;

    fn make_service(checkout: MockCheckoutService) -> Service {
        service(
            AppContext {
                checkout: Arc::new(checkout),
                ..app_context()
            },
            Router::with_path("cart/discount").post(handler),
        )
    }

    #[tokio::test]
    async fn test_preview_discount_success() -> TestResult {
        let mut checkout = MockCheckoutService::new();

        checkout
            .expect_preview_discount()
            .once()
            .withf(|token, code| token == TEST_SESSION && code == "spring10")
            .return_once(|_, _| {
                Ok(DiscountPreview {
                    code: "SPRING10".to_string(),
                    kind: DiscountKind::Percentage,
                    value: 1_000,
                    discount_amount: 600,
                    subtotal: 6_000,
                    total_before: 6_000,
                    total_after: 5_400,
                })
            });

        let mut res = TestClient::post("http://example.com/cart/discount")
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .json(&json!({ "code": "spring10" }))
            .send(&make_service(checkout))
            .await;

        let body: DiscountPreviewResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.code, "SPRING10");
        assert_eq!(body.kind, "percentage");
        assert_eq!(body.discount_amount, 600);
        assert_eq!(body.total_after, 5_400);

        Ok(())
    }

    #[tokio::test]
    async fn test_preview_expired_code_is_422() -> TestResult {
        let mut checkout = MockCheckoutService::new();

        checkout.expect_preview_discount().once().return_once(|_, _| {
            Err(CheckoutError::Discount(DiscountsServiceError::Rejected(
                DiscountRejection::Expired,
            )))
        });

        let res = TestClient::post("http://example.com/cart/discount")
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .json(&json!({ "code": "OLD" }))
            .send(&make_service(checkout))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNPROCESSABLE_ENTITY));

        Ok(())
    }

    #[tokio::test]
    async fn test_preview_blank_code_is_400() -> TestResult {
        let mut checkout = MockCheckoutService::new();

        checkout.expect_preview_discount().never();

        let res = TestClient::post("http://example.com/cart/discount")
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .json(&json!({ "code": "  " }))
            .send(&make_service(checkout))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
