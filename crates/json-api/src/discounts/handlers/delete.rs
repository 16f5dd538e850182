//! Delete Discount Code Handler

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::discounts::models::{DiscountCodeUuid, DiscountRemoval};

use crate::{
    discounts::{errors::into_status_error, models::DiscountCodeResponse},
    extensions::*,
};

/// Discount Code Removed Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct DiscountCodeRemovedResponse {
    /// `false` when the code had been redeemed and was deactivated instead
    pub deleted: bool,

    /// The deactivated code, when it was kept
    pub discount: Option<DiscountCodeResponse>,
}

/// Delete Discount Code Handler
///
/// Codes that were never redeemed are deleted. Redeemed codes stay for order history and are
/// deactivated.
#[endpoint(
    tags("admin"),
    summary = "Delete Discount Code",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Discount code deleted or deactivated"),
        (status_code = StatusCode::NOT_FOUND, description = "Discount code not found"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    discount: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<DiscountCodeRemovedResponse>, StatusError> {
    let state = depot.state()?;

    let removal = state
        .app
        .discounts
        .delete_discount_code(DiscountCodeUuid::from_uuid(discount.into_inner()))
        .await
        .map_err(into_status_error)?;

    Ok(Json(match removal {
        DiscountRemoval::Deleted => DiscountCodeRemovedResponse {
            deleted: true,
            discount: None,
        },
        DiscountRemoval::Deactivated(kept) => DiscountCodeRemovedResponse {
            deleted: false,
            discount: Some(kept.into()),
        },
    }))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use atelier_app::domain::discounts::{DiscountsServiceError, MockDiscountsService};

    use crate::discounts::handlers::tests::{discounts_service, make_discount};

    use super::*;

    fn make_service(discounts: MockDiscountsService) -> Service {
        discounts_service(
            discounts,
            Router::with_path("admin/discounts/{discount}").delete(handler),
        )
    }

    #[tokio::test]
    async fn test_unused_code_is_deleted() -> TestResult {
        let mut discounts = MockDiscountsService::new();

        discounts
            .expect_delete_discount_code()
            .once()
            .return_once(|_| Ok(DiscountRemoval::Deleted));

        let mut res = TestClient::delete(format!(
            "http://example.com/admin/discounts/{}",
            Uuid::now_v7()
        ))
        .send(&make_service(discounts))
        .await;

        let body: DiscountCodeRemovedResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert!(body.deleted);
        assert!(body.discount.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_redeemed_code_is_deactivated() -> TestResult {
        let mut kept = make_discount("SPRING10");
        kept.rule.active = false;
        let uuid = kept.uuid;

        let mut discounts = MockDiscountsService::new();

        discounts
            .expect_delete_discount_code()
            .once()
            .withf(move |d| *d == uuid)
            .return_once(move |_| Ok(DiscountRemoval::Deactivated(kept)));

        let mut res = TestClient::delete(format!("http://example.com/admin/discounts/{uuid}"))
            .send(&make_service(discounts))
            .await;

        let body: DiscountCodeRemovedResponse = res.take_json().await?;

        assert!(!body.deleted);
        assert_eq!(body.discount.map(|d| d.active), Some(false));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unknown_code_is_404() -> TestResult {
        let mut discounts = MockDiscountsService::new();

        discounts
            .expect_delete_discount_code()
            .once()
            .return_once(|_| Err(DiscountsServiceError::NotFound));

        let res = TestClient::delete(format!(
            "http://example.com/admin/discounts/{}",
            Uuid::now_v7()
        ))
        .send(&make_service(discounts))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
