//! User store provider: domain results and the provider service.
//!
//! The provider is what the user-schema library calls for create, lookup,
//! login, update and removal of identities and their login strategies.

pub mod domain;
pub mod service;

pub use domain::{Lookup, RemovalReport};
pub use service::UserStoreProvider;
