//! Mock Gateway
//!
//! Keeps intents in process memory. Used for local development and by the test suite, which can
//! make it decline or stall on demand.

use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::payments::{
    CreatePaymentIntent, PaymentGateway, PaymentGatewayError, PaymentIntent, PaymentIntentStatus,
    RefundRequest, RefundResult, validate_amount,
};

pub const MOCK_GATEWAY_NAME: &str = "mock";

#[derive(Debug, Default)]
struct MockState {
    intents: FxHashMap<String, PaymentIntent>,
    idempotency_keys: FxHashMap<String, String>,
    refunds: FxHashMap<String, RefundResult>,
    failure: Option<String>,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct MockGateway {
    minimum: u64,
    supports_zero: bool,
    state: Mutex<MockState>,
}

impl MockGateway {
    #[must_use]
    pub fn new(minimum: u64, supports_zero: bool) -> Self {
        Self {
            minimum,
            supports_zero,
            state: Mutex::default(),
        }
    }

    /// Decline every subsequent call with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failure = Some(message.into());
        }
    }

    /// Stop declining calls.
    pub fn succeed(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.failure = None;
        }
    }

    /// Delay every subsequent intent creation and refund by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut state) = self.state.lock() {
            state.latency = latency;
        }
    }

    /// Number of intents created so far.
    #[must_use]
    pub fn intent_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.intents.len())
    }

    /// Status of every intent created so far.
    #[must_use]
    pub fn intent_statuses(&self) -> Vec<PaymentIntentStatus> {
        self.state.lock().map_or_else(
            |_poisoned| Vec::new(),
            |state| state.intents.values().map(|intent| intent.status).collect(),
        )
    }

    /// Number of refunds paid out so far; idempotent replays are not counted.
    #[must_use]
    pub fn refund_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.refunds.len())
    }

    async fn simulate_latency(&self) -> Result<(), PaymentGatewayError> {
        let latency = self.state()?.latency;

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        Ok(())
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>, PaymentGatewayError> {
        self.state
            .lock()
            .map_err(|_poisoned| PaymentGatewayError::Unavailable("mock state poisoned".into()))
    }

    fn check_failure(state: &MockState) -> Result<(), PaymentGatewayError> {
        match &state.failure {
            Some(message) => Err(PaymentGatewayError::Declined(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        MOCK_GATEWAY_NAME
    }

    fn supports_zero_amount(&self) -> bool {
        self.supports_zero
    }

    fn minimum_amount(&self) -> u64 {
        self.minimum
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

        self.simulate_latency().await?;

        let mut state = self.state()?;

        Self::check_failure(&state)?;

        if let Some(existing) = state
            .idempotency_keys
            .get(&request.idempotency_key)
            .and_then(|id| state.intents.get(id))
        {
            return Ok(existing.clone());
        }

        let intent = PaymentIntent {
            id: format!("mock_pi_{}", Uuid::new_v4().simple()),
            amount: request.amount,
            currency: request.currency,
            client_secret: format!("mock_secret_{}", Uuid::new_v4().simple()),
            status: PaymentIntentStatus::RequiresPayment,
        };

        state
            .idempotency_keys
            .insert(request.idempotency_key, intent.id.clone());
        state.intents.insert(intent.id.clone(), intent.clone());

        Ok(intent)
    }

    async fn confirm_payment(&self, intent_id: &str) -> Result<(), PaymentGatewayError> {
        let mut state = self.state()?;

        Self::check_failure(&state)?;

        let intent = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| PaymentGatewayError::IntentNotFound(intent_id.to_string()))?;

        intent.status = PaymentIntentStatus::Succeeded;

        Ok(())
    }

    async fn cancel_payment(&self, intent_id: &str) -> Result<(), PaymentGatewayError> {
        let mut state = self.state()?;

        let intent = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| PaymentGatewayError::IntentNotFound(intent_id.to_string()))?;

        intent.status = PaymentIntentStatus::Canceled;

        Ok(())
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, PaymentGatewayError> {
        self.simulate_latency().await?;

        let mut state = self.state()?;

        Self::check_failure(&state)?;

        if let Some(existing) = state.refunds.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }

        let intent = state.intents.get(&request.intent_id).ok_or_else(|| {
            PaymentGatewayError::IntentNotFound(request.intent_id.clone())
        })?;

        let amount = request.amount.unwrap_or(intent.amount);

        if amount > intent.amount {
            return Err(PaymentGatewayError::Declined(format!(
                "refund of {amount} exceeds captured {}",
                intent.amount
            )));
        }

        let refund = RefundResult {
            refund_id: format!("mock_re_{}", Uuid::new_v4().simple()),
            intent_id: intent.id.clone(),
            amount,
            currency: intent.currency.clone(),
            status: "succeeded".to_string(),
        };

        state
            .refunds
            .insert(request.idempotency_key, refund.clone());

        Ok(refund)
    }

    async fn get_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, PaymentGatewayError> {
        self.state()?
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| PaymentGatewayError::IntentNotFound(intent_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use atelier::payments::AmountError;
    use testresult::TestResult;

    use super::*;

    fn request(amount: u64, key: &str) -> CreatePaymentIntent {
        CreatePaymentIntent {
            amount,
            currency: "EUR".to_string(),
            customer_ref: "buyer@example.com".to_string(),
            description: "Order ORD-1".to_string(),
            line_items: Vec::new(),
            metadata: BTreeMap::new(),
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn intents_are_created_and_retrievable() -> TestResult {
        let gateway = MockGateway::new(1, false);

        let intent = gateway.create_payment_intent(request(1_500, "a")).await?;

        assert!(intent.id.starts_with("mock_pi_"));
        assert!(intent.client_secret.starts_with("mock_secret_"));
        assert_eq!(gateway.get_payment_intent(&intent.id).await?, intent);

        Ok(())
    }

    #[tokio::test]
    async fn repeated_idempotency_key_returns_same_intent() -> TestResult {
        let gateway = MockGateway::new(1, false);

        let first = gateway.create_payment_intent(request(1_500, "a")).await?;
        let second = gateway.create_payment_intent(request(1_500, "a")).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(gateway.intent_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_when_unsupported() {
        let gateway = MockGateway::new(1, false);

        let result = gateway.create_payment_intent(request(0, "a")).await;

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
    async fn configured_failure_declines_until_cleared() -> TestResult {
        let gateway = MockGateway::new(1, false);

        gateway.fail_with("card declined");

        let result = gateway.create_payment_intent(request(1_500, "a")).await;

        assert!(
            matches!(result, Err(PaymentGatewayError::Declined(ref message)) if message == "card declined"),
            "expected Declined, got {result:?}"
        );

        gateway.succeed();

        gateway.create_payment_intent(request(1_500, "a")).await?;

        Ok(())
    }

    #[tokio::test]
    async fn cancel_and_confirm_update_status() -> TestResult {
        let gateway = MockGateway::new(1, false);

        let paid = gateway.create_payment_intent(request(1_500, "a")).await?;
        let dropped = gateway.create_payment_intent(request(1_500, "b")).await?;

        gateway.confirm_payment(&paid.id).await?;
        gateway.cancel_payment(&dropped.id).await?;

        assert_eq!(
            gateway.get_payment_intent(&paid.id).await?.status,
            PaymentIntentStatus::Succeeded
        );
        assert_eq!(
            gateway.get_payment_intent(&dropped.id).await?.status,
            PaymentIntentStatus::Canceled
        );

        Ok(())
    }

    fn refund(intent_id: &str, amount: Option<u64>, key: &str) -> RefundRequest {
        RefundRequest {
            intent_id: intent_id.to_string(),
            amount,
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn refund_defaults_to_full_amount_and_caps_partial() -> TestResult {
        let gateway = MockGateway::new(1, false);

        let intent = gateway.create_payment_intent(request(1_500, "a")).await?;

        let full = gateway.refund(refund(&intent.id, None, "r1")).await?;

        assert!(full.refund_id.starts_with("mock_re_"));
        assert_eq!(full.amount, 1_500);

        let result = gateway.refund(refund(&intent.id, Some(1_501), "r2")).await;

        assert!(
            matches!(result, Err(PaymentGatewayError::Declined(_))),
            "expected Declined, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn unknown_intent_is_not_found() {
        let gateway = MockGateway::new(1, false);

        let result = gateway.refund(refund("mock_pi_missing", None, "r1")).await;

        assert!(
            matches!(result, Err(PaymentGatewayError::IntentNotFound(_))),
            "expected IntentNotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn repeated_refund_key_pays_out_once() -> TestResult {
        let gateway = MockGateway::new(1, false);

        let intent = gateway.create_payment_intent(request(1_500, "a")).await?;

        let first = gateway.refund(refund(&intent.id, None, "r1")).await?;
        let second = gateway.refund(refund(&intent.id, None, "r1")).await?;

        assert_eq!(first.refund_id, second.refund_id);
        assert_eq!(gateway.refund_count(), 1);

        Ok(())
    }
}
