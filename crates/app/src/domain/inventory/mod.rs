//! Inventory
//!
//! Per-variant stock counts. Stock only moves through the ledger's conditional reserve and
//! unconditional release, both of which run inside the caller's transaction.

pub mod errors;
mod ledger;
pub mod service;

pub use errors::InventoryError;
pub(crate) use ledger::PgInventoryLedger;
pub use service::*;
