//! Checkout
//!
//! Turns the session's cart into an order and opens a payment intent. The buyer completes
//! payment with the provider; the result arrives later through the payment webhook.

pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod models;
