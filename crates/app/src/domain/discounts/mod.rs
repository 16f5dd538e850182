//! Discount Codes

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::DiscountsServiceError;
pub(crate) use repository::PgDiscountsRepository;
pub use service::*;
