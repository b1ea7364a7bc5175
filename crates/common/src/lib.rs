//! Shared runtime helpers: logging initialisation and environment loading.

pub mod env;
pub mod utils;
