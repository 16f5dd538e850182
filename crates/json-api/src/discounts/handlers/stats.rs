//! Discount Code Stats Handler

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use atelier_app::domain::discounts::models::DiscountCodeUuid;

use crate::{
    discounts::{errors::into_status_error, models::DiscountStatsResponse},
    extensions::*,
};

/// Discount Code Stats Handler
///
/// Redemptions so far, uses left under the cap and days until expiry.
#[endpoint(
    tags("admin"),
    summary = "Discount Code Stats",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Discount code stats"),
        (status_code = StatusCode::NOT_FOUND, description = "Discount code not found"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    discount: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<DiscountStatsResponse>, StatusError> {
    let state = depot.state()?;

    let stats = state
        .app
        .discounts
        .discount_stats(DiscountCodeUuid::from_uuid(discount.into_inner()))
        .await
        .map_err(into_status_error)?;

    Ok(Json(stats.into()))
}
