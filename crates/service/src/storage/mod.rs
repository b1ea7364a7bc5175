//! Storage abstractions for the provider
//!
//! `DocumentStore` is the seam between the provider and the managed
//! key-value store. Items are schemaless attribute maps keyed by one string
//! attribute per table; secondary indexes answer equality queries on a
//! single attribute.

pub mod expression;
pub mod json_file_store;
pub mod memory;
pub mod schema;

use async_trait::async_trait;
use models::Item;

pub use crate::errors::StoreError;
pub use expression::UpdateExpression;
pub use json_file_store::JsonFileStore;
pub use memory::MemoryStore;
pub use schema::{IndexSchema, TableSchema};

/// Precondition evaluated atomically with a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Succeeds only if no stored item under the same key carries the attribute.
    AttributeNotExists(String),
}

/// Query/put/update/delete primitives of a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a table and its indexes. Creating an existing table is a no-op.
    async fn create_table(&self, schema: &TableSchema) -> Result<(), StoreError>;

    /// Write a full item, replacing any item under the same key.
    ///
    /// # Errors
    /// - `ConditionFailed` when `condition` does not hold
    /// - `InvalidKey` when the item lacks the table's key attribute
    async fn put(&self, table: &str, item: Item, condition: Option<Condition>) -> Result<(), StoreError>;

    /// Primary-key lookup.
    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>, StoreError>;

    /// Equality query against a secondary index.
    async fn query_index(&self, table: &str, index: &str, value: &str) -> Result<Vec<Item>, StoreError>;

    /// Apply SET/REMOVE clauses to an existing item and return the updated
    /// attributes. Fails with `NotFound` when the key is absent.
    async fn update(&self, table: &str, key: &str, update: &UpdateExpression) -> Result<Item, StoreError>;

    /// Delete by primary key. Deleting an absent key succeeds.
    async fn delete(&self, table: &str, key: &str) -> Result<(), StoreError>;
}
