//! Carts
//!
//! Session-token keyed carts. Lines are merged per (product, variant) by the database, so
//! concurrent adds against the same token never lose quantity.

pub mod errors;
pub mod models;
mod repositories;
pub mod service;

pub use errors::CartsServiceError;
pub use service::*;
