//! Remove Cart Item Handler

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use atelier_app::domain::carts::models::CartItemUuid;

use crate::{
    carts::{errors::into_status_error, models::CartResponse, session::session_token_or_404},
    extensions::*,
};

/// Remove Cart Item Handler
#[endpoint(
    tags("cart"),
    summary = "Remove Cart Item",
    responses(
        (status_code = StatusCode::OK, description = "Cart item removed"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart or cart item not found"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    )
)]
pub(crate) async fn handler(
    item: PathParam<Uuid>,
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.state()?;
    let token = session_token_or_404(req)?;

    let cart = state
        .app
        .carts
        .remove_item(&token, CartItemUuid::from_uuid(item.into_inner()))
        .await
        .map_err(into_status_error)?;

    Ok(Json(CartResponse::priced(state.app.carts.as_ref(), cart)?))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use atelier_app::domain::carts::{CartsServiceError, MockCartsService};

    use crate::{
        carts::session::SESSION_HEADER,
        test_helpers::{TEST_SESSION, carts_mock, carts_service, make_cart},
    };

    use super::*;

    fn make_service(carts: MockCartsService) -> Service {
        carts_service(carts, Router::with_path("cart/items/{item}").delete(handler))
    }

    #[tokio::test]
    async fn test_remove_item_success() -> TestResult {
        let item = Uuid::now_v7();
        let mut cart = make_cart(1);
        cart.items.clear();

        let mut carts = carts_mock();

        carts
            .expect_remove_item()
            .once()
            .withf(move |token, i| token == TEST_SESSION && i.into_uuid() == item)
            .return_once(move |_, _| Ok(cart));

        let mut res = TestClient::delete(format!("http://example.com/cart/items/{item}"))
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .send(&make_service(carts))
            .await;

        let body: CartResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert!(body.items.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_item_of_another_cart_is_404() -> TestResult {
        let mut carts = MockCartsService::new();

        carts
            .expect_remove_item()
            .once()
            .return_once(|_, _| Err(CartsServiceError::ItemNotFound));

        let res = TestClient::delete(format!("http://example.com/cart/items/{}", Uuid::now_v7()))
            .add_header(SESSION_HEADER, TEST_SESSION, true)
            .send(&make_service(carts))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
