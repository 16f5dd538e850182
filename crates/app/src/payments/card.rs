//! Card Processor Gateway
//!
//! Talks to a Stripe-compatible REST API: form-encoded requests authenticated with the secret key,
//! JSON responses, and `t=<unix>,v1=<hex hmac>` webhook signatures.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use jiff::Timestamp;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use sha2::Sha256;

use crate::{
    payments::{
        CreatePaymentIntent, PaymentGateway, PaymentGatewayError, PaymentIntent,
        PaymentIntentStatus, RefundRequest, RefundResult, validate_amount,
    },
    secrets::SecretString,
};

pub const CARD_GATEWAY_NAME: &str = "card";

/// Signatures older or newer than this many seconds are rejected.
pub const SIGNATURE_TOLERANCE_SECONDS: i64 = 300;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone)]
pub struct CardProcessorConfig {
    pub api_base: String,
    pub secret_key: SecretString,
    pub webhook_secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct CardProcessorGateway {
    client: Client,
    api_base: String,
    secret_key: SecretString,
    webhook_secret: SecretString,
}

impl CardProcessorGateway {
    #[must_use]
    pub fn new(config: CardProcessorConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key,
            webhook_secret: config.webhook_secret,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.api_base)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        intent_id: Option<&str>,
    ) -> Result<Value, PaymentGatewayError> {
        let response = request
            .basic_auth(self.secret_key.expose(), None::<&str>)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(api_error(status, &body, intent_id))
        }
    }
}

#[async_trait]
impl PaymentGateway for CardProcessorGateway {
    fn name(&self) -> &'static str {
        CARD_GATEWAY_NAME
    }

    fn supports_zero_amount(&self) -> bool {
        false
    }

    fn minimum_amount(&self) -> u64 {
        1
    }

    fn signs_webhooks(&self) -> bool {
        true
    }

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), PaymentGatewayError> {
        verify_signature(
            payload,
            signature,
            self.webhook_secret.expose(),
            Timestamp::now().as_second(),
        )
    }

    #[tracing::instrument(
        name = "payments.card.create_payment_intent",
        skip(self, request),
        fields(amount = request.amount, currency = %request.currency),
        err
    )]
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntent,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        validate_amount(self, i64::try_from(request.amount).unwrap_or(i64::MAX))?;

        let builder = self
            .client
            .post(self.url("payment_intents"))
            .header(IDEMPOTENCY_KEY_HEADER, &request.idempotency_key)
            .form(&intent_form(&request));

        let body = self.send(builder, None).await?;

        parse_intent(&body)
    }

    async fn confirm_payment(&self, intent_id: &str) -> Result<(), PaymentGatewayError> {
        let builder = self
            .client
            .post(self.url(&format!("payment_intents/{intent_id}/confirm")));

        self.send(builder, Some(intent_id)).await?;

        Ok(())
    }

    async fn cancel_payment(&self, intent_id: &str) -> Result<(), PaymentGatewayError> {
        let builder = self
            .client
            .post(self.url(&format!("payment_intents/{intent_id}/cancel")));

        self.send(builder, Some(intent_id)).await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "payments.card.refund",
        skip(self, request),
        fields(intent_id = %request.intent_id, amount = ?request.amount),
        err
    )]
    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, PaymentGatewayError> {
        let builder = self
            .client
            .post(self.url("refunds"))
            .header(IDEMPOTENCY_KEY_HEADER, &request.idempotency_key)
            .form(&refund_form(&request));

        let body = self.send(builder, Some(&request.intent_id)).await?;

        parse_refund(&body, &request.intent_id)
    }

    async fn get_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        let builder = self
            .client
            .get(self.url(&format!("payment_intents/{intent_id}")));

        let body = self.send(builder, Some(intent_id)).await?;

        parse_intent(&body)
    }
}

fn refund_form(request: &RefundRequest) -> Vec<(String, String)> {
    let mut form = vec![("payment_intent".to_string(), request.intent_id.clone())];

    if let Some(amount) = request.amount {
        form.push(("amount".to_string(), amount.to_string()));
    }

    form
}

fn intent_form(request: &CreatePaymentIntent) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount.to_string()),
        ("currency".to_string(), request.currency.to_lowercase()),
        ("description".to_string(), request.description.clone()),
        ("receipt_email".to_string(), request.customer_ref.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];

    form.extend(
        request
            .metadata
            .iter()
            .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
    );

    form
}

fn parse_intent(body: &Value) -> Result<PaymentIntent, PaymentGatewayError> {
    let field = |name: &str| {
        body[name]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PaymentGatewayError::UnexpectedResponse(format!("missing {name}")))
    };

    let status = field("status")?
        .parse::<PaymentIntentStatus>()
        .map_err(|status| PaymentGatewayError::UnexpectedResponse(format!("status {status}")))?;

    Ok(PaymentIntent {
        id: field("id")?,
        amount: body["amount"]
            .as_u64()
            .ok_or_else(|| PaymentGatewayError::UnexpectedResponse("missing amount".into()))?,
        currency: field("currency")?.to_uppercase(),
        client_secret: field("client_secret")?,
        status,
    })
}

fn parse_refund(body: &Value, intent_id: &str) -> Result<RefundResult, PaymentGatewayError> {
    let text = |name: &str| {
        body[name]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PaymentGatewayError::UnexpectedResponse(format!("missing {name}")))
    };

    let status = text("status")?;

    if status == "failed" || status == "canceled" {
        return Err(PaymentGatewayError::Declined(format!("refund {status}")));
    }

    Ok(RefundResult {
        refund_id: text("id")?,
        intent_id: intent_id.to_string(),
        amount: body["amount"]
            .as_u64()
            .ok_or_else(|| PaymentGatewayError::UnexpectedResponse("missing amount".into()))?,
        currency: text("currency")?.to_uppercase(),
        status,
    })
}

fn api_error(status: StatusCode, body: &Value, intent_id: Option<&str>) -> PaymentGatewayError {
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or("no error message")
        .to_string();

    match (status, intent_id) {
        (StatusCode::NOT_FOUND, Some(intent_id)) => {
            PaymentGatewayError::IntentNotFound(intent_id.to_string())
        }
        (StatusCode::PAYMENT_REQUIRED | StatusCode::BAD_REQUEST, _) => {
            PaymentGatewayError::Declined(message)
        }
        _ => PaymentGatewayError::UnexpectedResponse(format!("{status}: {message}")),
    }
}

/// Verify a `t=<unix>,v1=<hex>` signature header over `payload`.
///
/// # Errors
///
/// Returns [`PaymentGatewayError::InvalidSignature`] when the header is malformed, no `v1`
/// signature matches, or the timestamp is outside the tolerance around `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), PaymentGatewayError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',').map(str::trim) {
        if let Some(value) = part.strip_prefix("t=") {
            timestamp = Some(value);
        } else if let Some(value) = part.strip_prefix("v1=") {
            signatures.push(value);
        }
    }

    let Some(timestamp) = timestamp else {
        return Err(PaymentGatewayError::InvalidSignature("missing timestamp"));
    };

    if signatures.is_empty() {
        return Err(PaymentGatewayError::InvalidSignature("missing v1 signature"));
    }

    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| PaymentGatewayError::InvalidSignature("invalid timestamp"))?;

    if (now - issued_at).abs() > SIGNATURE_TOLERANCE_SECONDS {
        return Err(PaymentGatewayError::InvalidSignature("timestamp outside tolerance"));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentGatewayError::InvalidSignature("invalid secret"))?;

    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.into_iter().any(|signature| {
        hex::decode(signature).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(PaymentGatewayError::InvalidSignature("signature mismatch"))
    }
}
