//! Checkout
//!
//! Loads the session's cart, resolves the discount code and hands both to the orders service.
//! The cart is cleared only after the order has committed.

pub mod errors;
pub mod service;

pub use errors::CheckoutError;
pub use service::*;
