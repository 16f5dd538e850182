//! Atelier
//!
//! Pricing, discount and payment-state rules for the Atelier storefront order core. Everything in
//! this crate is pure: persistence and I/O live in `atelier-app`.

pub mod discounts;
pub mod money;
pub mod payments;
pub mod pricing;
pub mod status;
