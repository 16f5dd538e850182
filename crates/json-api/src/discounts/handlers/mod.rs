//! Discount Code Handlers

pub(crate) mod create;
pub(crate) mod delete;
pub(crate) mod get;
pub(crate) mod index;
pub(crate) mod stats;
pub(crate) mod update;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jiff::Timestamp;
    use salvo::prelude::*;

    use atelier::discounts::{DiscountKind, DiscountRule};
    use atelier_app::{
        context::AppContext,
        domain::discounts::{
            MockDiscountsService,
            models::{DiscountCode, DiscountCodeUuid},
        },
    };

    use crate::test_helpers::{app_context, service};

    pub(super) fn discounts_service(discounts: MockDiscountsService, route: Router) -> Service {
        service(
            AppContext {
                discounts: Arc::new(discounts),
                ..app_context()
            },
            route,
        )
    }

    pub(super) fn make_discount(code: &str) -> DiscountCode {
        DiscountCode {
            uuid: DiscountCodeUuid::new(),
            code: code.to_string(),
            rule: DiscountRule {
                kind: DiscountKind::Percentage,
                value: 1_000,
                min_purchase: 0,
                max_uses: Some(10),
                used_count: 4,
                starts_at: None,
                expires_at: None,
                active: true,
            },
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }
}
