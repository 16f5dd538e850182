//! Storefront order core: carts, inventory, checkout, payment gateways and webhook reconciliation.

pub mod context;
pub mod database;
pub mod domain;
pub mod notifications;
pub mod payments;
pub mod scheduler;
pub mod secrets;

#[cfg(test)]
mod test;

mod uuids;
