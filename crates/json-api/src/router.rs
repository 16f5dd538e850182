//! App Router

use salvo::Router;

use crate::{auth, carts, checkout, discounts, jobs, orders, webhooks};

/// Storefront routes plus the bearer-protected admin routes.
pub(crate) fn app_router() -> Router {
    Router::new()
        .push(
            Router::with_path("cart")
                .get(carts::handlers::get::handler)
                .delete(carts::handlers::clear::handler)
                .push(Router::with_path("discount").post(carts::handlers::discount::handler))
                .push(
                    Router::with_path("items")
                        .post(carts::items::handlers::create::handler)
                        .push(
                            Router::with_path("{item}")
                                .patch(carts::items::handlers::update::handler)
                                .delete(carts::items::handlers::delete::handler),
                        ),
                ),
        )
        .push(Router::with_path("checkout").post(checkout::handlers::create::handler))
        .push(Router::with_path("webhooks/payments").post(webhooks::handlers::payments::handler))
        .push(
            Router::with_path("admin")
                .hoop(auth::middleware::handler)
                .push(
                    Router::with_path("orders")
                        .get(orders::handlers::index::handler)
                        .push(
                            Router::with_path("{order}")
                                .get(orders::handlers::get::handler)
                                .push(
                                    Router::with_path("fulfillment")
                                        .put(orders::handlers::fulfillment::handler),
                                )
                                .push(
                                    Router::with_path("refund")
                                        .post(orders::handlers::refund::handler),
                                ),
                        ),
                )
                .push(
                    Router::with_path("discounts")
                        .get(discounts::handlers::index::handler)
                        .post(discounts::handlers::create::handler)
                        .push(
                            Router::with_path("{discount}")
                                .get(discounts::handlers::get::handler)
                                .patch(discounts::handlers::update::handler)
                                .delete(discounts::handlers::delete::handler)
                                .push(
                                    Router::with_path("stats")
                                        .get(discounts::handlers::stats::handler),
                                ),
                        ),
                )
                .push(
                    Router::with_path("jobs")
                        .get(jobs::handlers::index::handler)
                        .push(Router::with_path("{job}/run").post(jobs::handlers::run::handler)),
                ),
        )
}
