//! User store provider over a document key-value store.
//! - `storage`: the `DocumentStore` seam, table schemas and bundled stores.
//! - `provider`: create/lookup/login/update/remove of users and strategies.
//! - `password`: argon2 hashing for `LOCAL` strategies.

pub mod errors;
pub mod password;
pub mod provider;
pub mod storage;

pub use errors::{ServiceError, StoreError};
pub use provider::{Lookup, RemovalReport, UserStoreProvider};
