//! Payment Gateways
//!
//! A uniform capability set over the payment providers the store can sell through. Exactly one
//! implementation is selected at startup.

use async_trait::async_trait;
use atelier::payments::{self, AmountPolicy};
use mockall::automock;

pub mod card;
pub mod errors;
pub mod marketplace;
pub mod mock;
pub mod models;

pub use errors::PaymentGatewayError;
pub use models::*;

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Name recorded on every order paid through this gateway.
    fn name(&self) -> &'static str;

    /// Whether a zero amount may be charged.
    fn supports_zero_amount(&self) -> bool;

    /// Smallest chargeable amount in minor units.
    fn minimum_amount(&self) -> u64;

    /// Whether webhook deliveries carry a verifiable signature.
    fn signs_webhooks(&self) -> bool;

    /// Verify a raw webhook body against its signature header (empty when absent).
    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), PaymentGatewayError>;

    /// Open an intent for `request.amount`.
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntent,
    ) -> Result<PaymentIntent, PaymentGatewayError>;

    async fn confirm_payment(&self, intent_id: &str) -> Result<(), PaymentGatewayError>;

    async fn cancel_payment(&self, intent_id: &str) -> Result<(), PaymentGatewayError>;

    /// Refund `request.amount` minor units, or everything captured when `None`.
    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, PaymentGatewayError>;

    async fn get_payment_intent(&self, intent_id: &str)
    -> Result<PaymentIntent, PaymentGatewayError>;
}

/// The amount limits `gateway` advertises.
#[must_use]
pub fn amount_policy(gateway: &dyn PaymentGateway) -> AmountPolicy {
    AmountPolicy {
        minimum: gateway.minimum_amount(),
        supports_zero: gateway.supports_zero_amount(),
    }
}

/// Check `amount` against `gateway`'s limits.
///
/// # Errors
///
/// Returns [`PaymentGatewayError::InvalidAmount`] for negative amounts, unsupported zero amounts
/// and amounts below the gateway minimum.
pub fn validate_amount(
    gateway: &dyn PaymentGateway,
    amount: i64,
) -> Result<(), PaymentGatewayError> {
    payments::validate_amount(amount, amount_policy(gateway))?;

    Ok(())
}
