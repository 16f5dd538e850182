//! Get Cart Handler

use salvo::prelude::*;

use crate::{
    carts::{errors::into_status_error, models::CartResponse, session::session_token_or_issue},
    extensions::*,
};

/// Get Cart Handler
///
/// Returns the caller's cart, creating an empty one (and a session cookie) on first use.
#[endpoint(
    tags("cart"),
    summary = "Get Cart",
    responses(
        (status_code = StatusCode::OK, description = "Cart found"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Cart total cannot be represented"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.state()?;
    let token = session_token_or_issue(req, res);

    let cart = state
        .app
        .carts
        .get_or_create(&token)
        .await
        .map_err(into_status_error)?;

    Ok(Json(CartResponse::priced(state.app.carts.as_ref(), cart)?))
}
