//! Order Index Handler

use std::str::FromStr;

use jiff::Timestamp;
use salvo::{
    oapi::{ToSchema, extract::QueryParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use atelier_app::domain::orders::models::OrderFilter;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::OrderResponse},
};

/// Orders Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrdersResponse {
    /// Newest first
    pub orders: Vec<OrderResponse>,

    /// Number of orders matching the filter across all pages
    pub total: u64,

    pub page: u32,

    pub per_page: u32,
}

fn parse_optional<T>(value: Option<String>, message: &str) -> Result<Option<T>, StatusError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(|value| value.parse::<T>())
        .transpose()
        .or_400(message)
}

/// Order Index Handler
///
/// Lists orders, newest first, filtered by status, customer email and creation time.
#[endpoint(
    tags("admin"),
    summary = "List Orders",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Orders listed"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid filter"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[expect(clippy::too_many_arguments, reason = "one extractor per query filter")]
pub(crate) async fn handler(
    payment_status: QueryParam<String, false>,
    fulfillment_status: QueryParam<String, false>,
    email: QueryParam<String, false>,
    created_from: QueryParam<String, false>,
    created_to: QueryParam<String, false>,
    page: QueryParam<u32, false>,
    per_page: QueryParam<u32, false>,
    depot: &mut Depot,
) -> Result<Json<OrdersResponse>, StatusError> {
    let state = depot.state()?;

    let filter = OrderFilter {
        payment_status: parse_optional(payment_status.into_inner(), "Unknown payment status")?,
        fulfillment_status: parse_optional(
            fulfillment_status.into_inner(),
            "Unknown fulfillment status",
        )?,
        customer_email: email
            .into_inner()
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty()),
        created_from: parse_optional::<Timestamp>(
            created_from.into_inner(),
            "Invalid created_from",
        )?,
        created_to: parse_optional::<Timestamp>(created_to.into_inner(), "Invalid created_to")?,
        page: page.into_inner(),
        per_page: per_page.into_inner(),
    };

    let page = state
        .app
        .orders
        .list_orders(filter)
        .await
        .map_err(into_status_error)?;

    Ok(Json(OrdersResponse {
        orders: page.orders.into_iter().map(Into::into).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
    }))
}
