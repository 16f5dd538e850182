//! Marketplace Redirect Gateway
//!
//! The buyer completes payment on a third-party marketplace. The intent's client token is the
//! marketplace checkout URL; refunds can only be issued from the marketplace's seller tools.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Url;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::payments::{
    CreatePaymentIntent, PaymentGateway, PaymentGatewayError, PaymentIntent, PaymentIntentStatus,
    RefundRequest, RefundResult, validate_amount,
};

pub const MARKETPLACE_GATEWAY_NAME: &str = "marketplace";

/// Smallest amount, in minor units, the marketplace accepts.
pub const MARKETPLACE_MINIMUM_AMOUNT: u64 = 20;

#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    pub shop_url: String,
    pub callback_url: Option<String>,
}

#[derive(Debug)]
pub struct MarketplaceRedirectGateway {
    shop_url: Url,
    callback_url: Option<String>,
    intents: Mutex<FxHashMap<String, PaymentIntent>>,
}

impl MarketplaceRedirectGateway {
    /// # Errors
    ///
    /// Returns [`PaymentGatewayError::Unavailable`] if the shop URL is not a valid URL.
    pub fn new(config: MarketplaceConfig) -> Result<Self, PaymentGatewayError> {
        let shop_url = Url::parse(&config.shop_url).map_err(|error| {
            PaymentGatewayError::Unavailable(format!("invalid marketplace shop url: {error}"))
        })?;

        Ok(Self {
            shop_url,
            callback_url: config.callback_url.filter(|url| !url.is_empty()),
            intents: Mutex::default(),
        })
    }

    fn checkout_url(&self, intent_id: &str) -> String {
        let mut url = self.shop_url.clone();

        {
            let mut query = url.query_pairs_mut();

            query.append_pair("ref", intent_id);

            if let Some(callback_url) = &self.callback_url {
                query.append_pair("return_url", callback_url);
            }
        }

        url.into()
    }

    fn with_intents<T>(
        &self,
        f: impl FnOnce(&mut FxHashMap<String, PaymentIntent>) -> Result<T, PaymentGatewayError>,
    ) -> Result<T, PaymentGatewayError> {
        let mut intents = self.intents.lock().map_err(|_poisoned| {
            PaymentGatewayError::Unavailable("marketplace intents poisoned".into())
        })?;

        f(&mut intents)
    }
}

#[async_trait]
impl PaymentGateway for MarketplaceRedirectGateway {
    fn name(&self) -> &'static str {
        MARKETPLACE_GATEWAY_NAME
    }

    fn supports_zero_amount(&self) -> bool {
        false
    }

    fn minimum_amount(&self) -> u64 {
        MARKETPLACE_MINIMUM_AMOUNT
    }

    fn signs_webhooks(&self) -> bool {
        false
    }

    fn verify_webhook_signature(
        &self,
        _payload: &[u8],
        _signature: &str,
    ) -> Result<(), PaymentGatewayError> {
        Ok(())
    }

    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntent,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        validate_amount(self, i64::try_from(request.amount).unwrap_or(i64::MAX))?;

        let id = format!("mkt_{}", Uuid::new_v4().simple());

        let intent = PaymentIntent {
            client_secret: self.checkout_url(&id),
            id,
            amount: request.amount,
            currency: request.currency,
            status: PaymentIntentStatus::RequiresPayment,
        };

        self.with_intents(|intents| {
            intents.insert(intent.id.clone(), intent.clone());
            Ok(())
        })?;

        Ok(intent)
    }

    /// Completion happens on the marketplace; the local record is only marked as processing.
    async fn confirm_payment(&self, intent_id: &str) -> Result<(), PaymentGatewayError> {
        self.with_intents(|intents| {
            let intent = intents
                .get_mut(intent_id)
                .ok_or_else(|| PaymentGatewayError::IntentNotFound(intent_id.to_string()))?;

            intent.status = PaymentIntentStatus::Processing;

            Ok(())
        })
    }

    async fn cancel_payment(&self, intent_id: &str) -> Result<(), PaymentGatewayError> {
        self.with_intents(|intents| {
            let intent = intents
                .get_mut(intent_id)
                .ok_or_else(|| PaymentGatewayError::IntentNotFound(intent_id.to_string()))?;

            intent.status = PaymentIntentStatus::Canceled;

            Ok(())
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, PaymentGatewayError> {
        Err(PaymentGatewayError::ManualActionRequired(format!(
            "refund {} from the marketplace seller dashboard",
            request.intent_id
        )))
    }

    async fn get_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        self.with_intents(|intents| {
            intents
                .get(intent_id)
                .cloned()
                .ok_or_else(|| PaymentGatewayError::IntentNotFound(intent_id.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use atelier::payments::AmountError;
    use testresult::TestResult;

    use super::*;

    fn gateway(callback_url: Option<&str>) -> MarketplaceRedirectGateway {
        MarketplaceRedirectGateway::new(MarketplaceConfig {
            shop_url: "https://market.example/shop/atelier".to_string(),
            callback_url: callback_url.map(str::to_string),
        })
        .expect("valid shop url")
    }

    fn request(amount: u64) -> CreatePaymentIntent {
        CreatePaymentIntent {
            amount,
            currency: "EUR".to_string(),
            customer_ref: "buyer@example.com".to_string(),
            description: "Order ORD-1".to_string(),
            line_items: Vec::new(),
            metadata: BTreeMap::new(),
            idempotency_key: "key".to_string(),
        }
    }

    #[tokio::test]
    async fn client_secret_is_checkout_redirect() -> TestResult {
        let gateway = gateway(Some("https://atelier.example/return?x=1"));

        let intent = gateway.create_payment_intent(request(2_000)).await?;
        let url = Url::parse(&intent.client_secret)?;
        let pairs: BTreeMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(intent.id.starts_with("mkt_"));
        assert_eq!(url.path(), "/shop/atelier");
        assert_eq!(pairs.get("ref"), Some(&intent.id));
        assert_eq!(
            pairs.get("return_url").map(String::as_str),
            Some("https://atelier.example/return?x=1")
        );

        Ok(())
    }

    #[tokio::test]
    async fn amounts_below_twenty_minor_units_are_rejected() {
        let result = gateway(None).create_payment_intent(request(19)).await;

        assert!(
            matches!(
                result,
                Err(PaymentGatewayError::InvalidAmount(
                    AmountError::BelowMinimum { minimum: 20, .. }
                ))
            ),
            "expected BelowMinimum, got {result:?}"
        );
    }

    #[tokio::test]
    async fn zero_is_never_supported() {
        let result = gateway(None).create_payment_intent(request(0)).await;

        assert!(
            matches!(
                result,
                Err(PaymentGatewayError::InvalidAmount(
                    AmountError::ZeroNotSupported
                ))
            ),
            "expected ZeroNotSupported, got {result:?}"
        );
    }

    #[tokio::test]
    async fn refund_requires_manual_action() -> TestResult {
        let gateway = gateway(None);
        let intent = gateway.create_payment_intent(request(2_000)).await?;

        let result = gateway
            .refund(RefundRequest {
                intent_id: intent.id,
                amount: None,
                idempotency_key: "refund-1".to_string(),
            })
            .await;

        assert!(
            matches!(result, Err(PaymentGatewayError::ManualActionRequired(_))),
            "expected ManualActionRequired, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn invalid_shop_url_is_rejected() {
        let result = MarketplaceRedirectGateway::new(MarketplaceConfig {
            shop_url: "not a url".to_string(),
            callback_url: None,
        });

        assert!(
            matches!(result, Err(PaymentGatewayError::Unavailable(_))),
            "expected Unavailable, got {result:?}"
        );
    }
}
