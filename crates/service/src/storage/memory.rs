//! In-memory document store.
//!
//! Tables live in a `DashMap`; each table holds its items in key order.
//! Secondary indexes are answered by scanning attribute values, and the
//! conditional put is atomic because the whole table is locked for writes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use models::item::{string_attr, Item};

use super::{Condition, DocumentStore, StoreError, TableSchema, UpdateExpression};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Table {
    pub(crate) schema: TableSchema,
    #[serde(default)]
    pub(crate) items: BTreeMap<String, Item>,
}

/// Useful for testing and development. All data is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, Table>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn from_tables(tables: BTreeMap<String, Table>) -> Self {
        Self { tables: tables.into_iter().collect() }
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<String, Table> {
        self.tables.iter().map(|t| (t.key().clone(), t.value().clone())).collect()
    }

    /// Number of items in `table`; 0 for an unknown table.
    pub fn item_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.items.len()).unwrap_or(0)
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.key().clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_table(&self, schema: &TableSchema) -> Result<(), StoreError> {
        self.tables
            .entry(schema.name.clone())
            .or_insert_with(|| Table { schema: schema.clone(), items: BTreeMap::new() });
        Ok(())
    }

    async fn put(&self, table: &str, item: Item, condition: Option<Condition>) -> Result<(), StoreError> {
        let mut t = self.tables.get_mut(table).ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let key = string_attr(&item, &t.schema.key)
            .ok_or_else(|| StoreError::InvalidKey { table: table.to_string(), attribute: t.schema.key.clone() })?
            .to_string();
        if let Some(Condition::AttributeNotExists(attribute)) = &condition {
            if t.items.get(&key).map(|existing| existing.contains_key(attribute)).unwrap_or(false) {
                return Err(StoreError::ConditionFailed { table: table.to_string(), key });
            }
        }
        t.items.insert(key, item);
        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>, StoreError> {
        let t = self.tables.get(table).ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(t.items.get(key).cloned())
    }

    async fn query_index(&self, table: &str, index: &str, value: &str) -> Result<Vec<Item>, StoreError> {
        let t = self.tables.get(table).ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let attribute = &t
            .schema
            .index(index)
            .ok_or_else(|| StoreError::IndexNotFound { table: table.to_string(), index: index.to_string() })?
            .attribute;
        Ok(t.items
            .values()
            .filter(|item| string_attr(item, attribute) == Some(value))
            .cloned()
            .collect())
    }

    async fn update(&self, table: &str, key: &str, update: &UpdateExpression) -> Result<Item, StoreError> {
        let mut t = self.tables.get_mut(table).ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let item = t
            .items
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound { table: table.to_string(), key: key.to_string() })?;
        Ok(update.apply(item))
    }

    async fn delete(&self, table: &str, key: &str) -> Result<(), StoreError> {
        let mut t = self.tables.get_mut(table).ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        t.items.remove(key);
        Ok(())
    }
}
