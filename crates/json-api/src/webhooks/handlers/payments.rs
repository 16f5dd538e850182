//! Payment Webhook Handler

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use atelier_app::domain::reconciler::ReconcilerError;

use crate::{extensions::*, observability::record_webhook_event};

/// Signature header sent by the card processor.
pub(crate) const PAYMENT_SIGNATURE_HEADER: &str = "payment-signature";

/// Accepted for providers that use the Stripe header name.
pub(crate) const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Webhook Acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct WebhookAck {
    pub received: bool,

    /// What the delivery did, e.g. `paid`, `duplicate` or `invalid_signature`
    pub outcome: String,
}

fn signature(req: &Request) -> String {
    req.header::<String>(PAYMENT_SIGNATURE_HEADER)
        .or_else(|| req.header::<String>(STRIPE_SIGNATURE_HEADER))
        .unwrap_or_default()
}

fn rejection_outcome(error: &ReconcilerError) -> &'static str {
    match error {
        ReconcilerError::InvalidSignature(_) => "invalid_signature",
        ReconcilerError::MalformedPayload(_) => "malformed",
        _ => "error",
    }
}

fn ack(outcome: &str) -> Json<WebhookAck> {
    record_webhook_event(outcome);

    Json(WebhookAck {
        received: true,
        outcome: outcome.to_string(),
    })
}

/// Payment Webhook Handler
#[endpoint(
    tags("webhooks"),
    summary = "Payment Provider Webhook",
    responses(
        (status_code = StatusCode::OK, description = "Delivery acknowledged"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<WebhookAck>, StatusError> {
    let state = depot.state()?;
    let signature = signature(req);

    let payload = match req.payload().await {
        Ok(payload) => payload.clone(),
        Err(read_error) => {
            warn!("failed to read webhook body: {read_error}");

            return Ok(ack("malformed"));
        }
    };

    let event = match state.app.reconciler.parse_webhook(&payload, &signature) {
        Ok(event) => event,
        Err(rejected) => {
            warn!(
                signature_present = !signature.is_empty(),
                "webhook rejected: {rejected}"
            );

            return Ok(ack(rejection_outcome(&rejected)));
        }
    };

    let event_id = event.id.clone();
    let event_type = event.event_type.clone();

    match state.app.reconciler.handle_event(event).await {
        Ok(outcome) => {
            info!(%event_id, %event_type, outcome = outcome.as_str(), "webhook handled");

            Ok(ack(outcome.as_str()))
        }
        Err(failed) => {
            error!(%event_id, %event_type, "webhook processing failed, needs follow-up: {failed}");

            Ok(ack(rejection_outcome(&failed)))
        }
    }
}
