//! Get Discount Code Handler

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use atelier_app::domain::discounts::models::DiscountCodeUuid;

use crate::{
    discounts::{errors::into_status_error, models::DiscountCodeResponse},
    extensions::*,
};

/// Get Discount Code Handler
#[endpoint(
    tags("admin"),
    summary = "Get Discount Code",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Discount code found"),
        (status_code = StatusCode::NOT_FOUND, description = "Discount code not found"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    discount: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<DiscountCodeResponse>, StatusError> {
    let state = depot.state()?;

    let discount = state
        .app
        .discounts
        .get_discount_code(DiscountCodeUuid::from_uuid(discount.into_inner()))
        .await
        .map_err(into_status_error)?;

    Ok(Json(discount.into()))
}
