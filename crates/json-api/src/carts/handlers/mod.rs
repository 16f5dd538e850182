//! Cart Handlers

pub(crate) mod clear;
pub(crate) mod discount;
pub(crate) mod get;
