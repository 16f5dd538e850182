//! Cart endpoints
//!
//! Carts are addressed by an opaque session token carried in the `cart_session` cookie or the
//! `X-Cart-Session` header. A token is issued on first use.

pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod items;
pub(crate) mod models;
pub(crate) mod session;
