//! Add Cart Item Handler

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::{
    carts::{CartsServiceError, models::NewCartItem},
    catalog::models::{ProductUuid, VariantUuid},
};

use crate::{
    carts::{errors::into_status_error, models::CartResponse, session::session_token_or_issue},
    extensions::*,
};

/// Add Cart Item Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AddCartItemRequest {
    pub product_uuid: Uuid,

    /// Required when the product is sold in variants
    #[serde(default)]
    pub variant_uuid: Option<Uuid>,

    pub quantity: u32,
}

impl From<AddCartItemRequest> for NewCartItem {
    fn from(request: AddCartItemRequest) -> Self {
        NewCartItem {
            product_uuid: ProductUuid::from_uuid(request.product_uuid),
            variant_uuid: request.variant_uuid.map(VariantUuid::from_uuid),
            quantity: request.quantity,
        }
    }
}

/// Add Cart Item Handler
///
/// Adding a line that is already in the cart increases its quantity.
#[endpoint(
    tags("cart"),
    summary = "Add Cart Item",
    responses(
        (status_code = StatusCode::CREATED, description = "Item added"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::NOT_FOUND, description = "Product or variant not found"),
        (status_code = StatusCode::CONFLICT, description = "Not enough stock"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<AddCartItemRequest>,
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.state()?;
    let item: NewCartItem = json.into_inner().into();

    if item.quantity == 0 {
        return Err(into_status_error(CartsServiceError::InvalidQuantity));
    }

    let token = session_token_or_issue(req, res);

    let cart = state
        .app
        .carts
        .add_item(&token, item)
        .await
        .map_err(into_status_error)?;

    let body = CartResponse::priced(state.app.carts.as_ref(), cart)?;

    res.status_code(StatusCode::CREATED);

    Ok(Json(body))
}
