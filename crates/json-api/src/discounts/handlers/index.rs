//! Discount Code Index Handler

use atelier::discounts::DiscountKind;
use salvo::{
    oapi::{ToSchema, extract::QueryParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use atelier_app::domain::discounts::models::DiscountFilter;

use crate::{
    discounts::{errors::into_status_error, models::DiscountCodeResponse},
    extensions::*,
};

/// Discount Codes Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct DiscountCodesResponse {
    /// Newest first
    pub discounts: Vec<DiscountCodeResponse>,

    /// Number of codes matching the filter across all pages
    pub total: u64,

    pub page: u32,

    pub per_page: u32,
}

/// Discount Code Index Handler
///
/// Lists discount codes, newest first. `valid=true` keeps only codes redeemable right now.
#[endpoint(
    tags("admin"),
    summary = "List Discount Codes",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Discount codes listed"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid filter"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    active: QueryParam<bool, false>,
    valid: QueryParam<bool, false>,
    kind: QueryParam<String, false>,
    page: QueryParam<u32, false>,
    per_page: QueryParam<u32, false>,
    depot: &mut Depot,
) -> Result<Json<DiscountCodesResponse>, StatusError> {
    let state = depot.state()?;

    let filter = DiscountFilter {
        active: active.into_inner(),
        valid_only: valid.into_inner().unwrap_or_default(),
        kind: kind
            .into_inner()
            .map(|kind| kind.parse::<DiscountKind>())
            .transpose()
            .or_400("Unknown discount kind")?,
        page: page.into_inner(),
        per_page: per_page.into_inner(),
    };

    let page = state
        .app
        .discounts
        .list_discount_codes(filter)
        .await
        .map_err(into_status_error)?;

    Ok(Json(DiscountCodesResponse {
        discounts: page.discounts.into_iter().map(Into::into).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
    }))
}
