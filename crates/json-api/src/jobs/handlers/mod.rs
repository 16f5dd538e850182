//! Job Handlers

pub(crate) mod index;
pub(crate) mod run;
