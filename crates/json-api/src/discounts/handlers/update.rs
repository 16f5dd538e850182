//! Update Discount Code Handler

use atelier::discounts::DiscountKind;
use salvo::{
    oapi::{
        ToSchema,
        extract::{JsonBody, PathParam},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::discounts::models::{DiscountCodeUpdate, DiscountCodeUuid};

use crate::{
    discounts::{
        errors::into_status_error,
        models::{DiscountCodeResponse, parse_timestamp},
    },
    extensions::*,
};

/// Update Discount Code Request
///
/// Omitted fields keep their current value.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdateDiscountCodeRequest {
    #[serde(default)]
    pub code: Option<String>,

    /// `percentage` or `fixed_amount`
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub value: Option<u64>,

    #[serde(default)]
    pub min_purchase: Option<u64>,

    #[serde(default)]
    pub max_uses: Option<u64>,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub starts_at: Option<String>,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub expires_at: Option<String>,

    /// `false` deactivates the code
    #[serde(default)]
    pub active: Option<bool>,
}

impl UpdateDiscountCodeRequest {
    fn into_update(self) -> Result<DiscountCodeUpdate, StatusError> {
        Ok(DiscountCodeUpdate {
            code: self.code,
            kind: self
                .kind
                .map(|kind| kind.parse::<DiscountKind>())
                .transpose()
                .or_400("Unknown discount kind")?,
            value: self.value,
            min_purchase: self.min_purchase,
            max_uses: self.max_uses,
            starts_at: parse_timestamp(self.starts_at, "Invalid starts_at")?,
            expires_at: parse_timestamp(self.expires_at, "Invalid expires_at")?,
            active: self.active,
        })
    }
}

/// Update Discount Code Handler
#[endpoint(
    tags("admin"),
    summary = "Update Discount Code",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Discount code updated"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::NOT_FOUND, description = "Discount code not found"),
        (status_code = StatusCode::CONFLICT, description = "Discount code already exists"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid discount value"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    discount: PathParam<Uuid>,
    json: JsonBody<UpdateDiscountCodeRequest>,
    depot: &mut Depot,
) -> Result<Json<DiscountCodeResponse>, StatusError> {
    let state = depot.state()?;
    let update = json.into_inner().into_update()?;

    let updated = state
        .app
        .discounts
        .update_discount_code(DiscountCodeUuid::from_uuid(discount.into_inner()), update)
        .await
        .map_err(into_status_error)?;

    tracing::info!(code = %updated.code, active = updated.rule.active, "updated discount code");

    Ok(Json(updated.into()))
}
