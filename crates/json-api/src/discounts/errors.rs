//! Errors

use salvo::http::StatusError;
use tracing::error;

use atelier_app::domain::discounts::DiscountsServiceError;

pub(crate) fn into_status_error(error: DiscountsServiceError) -> StatusError {
    match error {
        DiscountsServiceError::NotFound => {
            StatusError::not_found().brief("Discount code not found")
        }
        DiscountsServiceError::AlreadyExists => {
            StatusError::conflict().brief("Discount code already exists")
        }
        DiscountsServiceError::Rejected(rejection) => {
            StatusError::unprocessable_entity().brief(rejection.to_string())
        }
        DiscountsServiceError::NoDiscount => StatusError::unprocessable_entity().brief(
            "Discount code does not reduce this subtotal",
        ),
        DiscountsServiceError::MissingRequiredData | DiscountsServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid discount code payload")
        }
        DiscountsServiceError::Sql(source) => {
            error!("discount storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use atelier::discounts::DiscountRejection;
    use salvo::http::StatusCode;

    use super::*;

    #[test]
    fn rejection_reason_is_reported() {
        let error = into_status_error(DiscountsServiceError::Rejected(DiscountRejection::Expired));

        assert_eq!(error.code, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error.brief, "discount code has expired");
    }

    #[test]
    fn duplicate_code_is_a_conflict() {
        assert_eq!(
            into_status_error(DiscountsServiceError::AlreadyExists).code,
            StatusCode::CONFLICT
        );
    }
}
