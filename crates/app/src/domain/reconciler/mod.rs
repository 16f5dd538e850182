//! Webhook Reconciler
//!
//! Applies payment-provider verdicts to orders. Every transition goes through
//! [`atelier::status::PaymentStatus::apply`], runs under the order's row lock and is recorded
//! against the provider's event id in the same transaction, so redelivered events are no-ops.

pub mod errors;
pub mod events;
mod repository;
pub mod service;

pub use errors::ReconcilerError;
pub use events::{ReconcileOutcome, WebhookEvent};
pub use service::*;
