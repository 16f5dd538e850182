//! Storefront Domain Concerns

pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod discounts;
pub mod inventory;
pub mod orders;
pub mod reconciler;
