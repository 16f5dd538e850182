//! Catalog
//!
//! Read-mostly product and variant lookup used to price cart lines and snapshot order items.

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::CatalogServiceError;
pub(crate) use repository::PgCatalogRepository;
pub use service::*;
