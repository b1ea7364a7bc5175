use serde::{Deserialize, Serialize};
use tracing::info;

use configs::StoreConfig;

use super::{DocumentStore, StoreError};

/// Primary key attribute of the users table.
pub const USER_KEY: &str = "id";
/// Primary key attribute of the strategies table.
pub const STRATEGY_KEY: &str = "key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub attribute: String,
}

/// Table definition: primary key attribute plus secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self { name: name.into(), key: key.into(), indexes: Vec::new() }
    }

    pub fn with_index(mut self, name: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.indexes.push(IndexSchema { name: name.into(), attribute: attribute.into() });
        self
    }

    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// `users`: keyed by `id`, indexed on `userHandle`.
pub fn users(cfg: &StoreConfig) -> TableSchema {
    TableSchema::new(&cfg.users_table, USER_KEY).with_index(&cfg.user_handle_index, "userHandle")
}

/// `strategies`: keyed by the composite `key`, indexed on `userId`.
pub fn strategies(cfg: &StoreConfig) -> TableSchema {
    TableSchema::new(&cfg.strategies_table, STRATEGY_KEY).with_index(&cfg.user_id_index, "userId")
}

/// Ensure both provider tables exist. Safe to run repeatedly.
pub async fn provision<S: DocumentStore + ?Sized>(store: &S, cfg: &StoreConfig) -> Result<(), StoreError> {
    for schema in [users(cfg), strategies(cfg)] {
        store.create_table(&schema).await?;
        info!(table = %schema.name, key = %schema.key, indexes = schema.indexes.len(), "table_provisioned");
    }
    Ok(())
}
