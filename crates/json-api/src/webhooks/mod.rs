//! Payment provider webhooks
//!
//! Deliveries are always acknowledged with 200. Rejected or failed deliveries are logged for
//! operator follow-up; redelivery of a handled event is a no-op either way.

pub(crate) mod handlers;
