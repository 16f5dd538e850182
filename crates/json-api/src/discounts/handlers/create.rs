//! Create Discount Code Handler

use atelier::discounts::DiscountKind;
use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use atelier_app::domain::discounts::models::{DiscountCodeUuid, NewDiscountCode};

use crate::{
    discounts::{
        errors::into_status_error,
        models::{DiscountCodeResponse, parse_timestamp},
    },
    extensions::*,
};

fn default_active() -> bool {
    true
}

/// Create Discount Code Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CreateDiscountCodeRequest {
    /// Stored upper-case; buyers may type it in any case
    pub code: String,

    /// `percentage` or `fixed_amount`
    pub kind: String,

    /// Basis points for percentages (1000 = 10%), minor units for fixed amounts
    pub value: u64,

    /// Smallest subtotal the code applies to, in minor units
    #[serde(default)]
    pub min_purchase: u64,

    /// Redemption cap; unlimited when omitted
    #[serde(default)]
    pub max_uses: Option<u64>,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub starts_at: Option<String>,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub expires_at: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

impl CreateDiscountCodeRequest {
    fn into_new_discount_code(self) -> Result<NewDiscountCode, StatusError> {
        let kind = self
            .kind
            .parse::<DiscountKind>()
            .or_400("Unknown discount kind")?;

        let starts_at = parse_timestamp(self.starts_at, "Invalid starts_at")?;
        let expires_at = parse_timestamp(self.expires_at, "Invalid expires_at")?;

        Ok(NewDiscountCode {
            uuid: DiscountCodeUuid::new(),
            code: self.code,
            kind,
            value: self.value,
            min_purchase: self.min_purchase,
            max_uses: self.max_uses,
            starts_at,
            expires_at,
            active: self.active,
        })
    }
}

/// Create Discount Code Handler
#[endpoint(
    tags("admin"),
    summary = "Create Discount Code",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Discount code created"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::CONFLICT, description = "Discount code already exists"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid discount value"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<CreateDiscountCodeRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<DiscountCodeResponse>, StatusError> {
    let state = depot.state()?;
    let discount = json.into_inner().into_new_discount_code()?;

    let created = state
        .app
        .discounts
        .create_discount_code(discount)
        .await
        .map_err(into_status_error)?;

    tracing::info!(code = %created.code, kind = %created.rule.kind, "created discount code");

    res.status_code(StatusCode::CREATED);

    Ok(Json(created.into()))
}
