use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::{fs, sync::Mutex};
use tracing::debug;

use models::Item;

use super::memory::{MemoryStore, Table};
use super::{Condition, DocumentStore, StoreError, TableSchema, UpdateExpression};

/// JSON file-backed document store.
///
/// Keeps every table in memory and rewrites the whole file after each write.
/// Intended for local development and tests where a managed store is overkill.
pub struct JsonFileStore {
    inner: MemoryStore,
    file_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`. Creates the file with no tables if missing.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tables: BTreeMap<String, Table> = match fs::read(&file_path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty: BTreeMap<String, Table> = BTreeMap::new();
                fs::write(&file_path, serde_json::to_vec(&empty)?).await?;
                empty
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %file_path.display(), tables = tables.len(), "json_file_store_opened");

        Ok(Arc::new(Self { inner: MemoryStore::from_tables(tables), file_path, write_lock: Mutex::new(()) }))
    }

    pub fn path(&self) -> &std::path::Path { &self.file_path }

    pub fn item_count(&self, table: &str) -> usize { self.inner.item_count(table) }

    async fn save(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let data = serde_json::to_vec(&self.inner.snapshot())?;
        fs::write(&self.file_path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn create_table(&self, schema: &TableSchema) -> Result<(), StoreError> {
        self.inner.create_table(schema).await?;
        self.save().await
    }

    async fn put(&self, table: &str, item: Item, condition: Option<Condition>) -> Result<(), StoreError> {
        self.inner.put(table, item, condition).await?;
        self.save().await
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>, StoreError> {
        self.inner.get(table, key).await
    }

    async fn query_index(&self, table: &str, index: &str, value: &str) -> Result<Vec<Item>, StoreError> {
        self.inner.query_index(table, index, value).await
    }

    async fn update(&self, table: &str, key: &str, update: &UpdateExpression) -> Result<Item, StoreError> {
        let updated = self.inner.update(table, key, update).await?;
        self.save().await?;
        Ok(updated)
    }

    async fn delete(&self, table: &str, key: &str) -> Result<(), StoreError> {
        self.inner.delete(table, key).await?;
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn json_file_store_persists_across_reopen() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("json_file_store_{}.json", uuid::Uuid::new_v4()));
        let store = JsonFileStore::open(&tmp).await?;

        // initially no tables
        assert_eq!(store.item_count("users"), 0);

        store.create_table(&TableSchema::new("users", "id").with_index("userHandle-index", "userHandle")).await?;
        let mut a = Item::new();
        a.insert("id".into(), json!("1"));
        a.insert("userHandle".into(), json!("alice"));
        a.insert("bio".into(), json!("hi"));
        store.put("users", a, None).await?;
        let mut b = Item::new();
        b.insert("id".into(), json!("2"));
        b.insert("userHandle".into(), json!("bob"));
        store.put("users", b, None).await?;

        store.update("users", "1", &UpdateExpression::new().remove("bio")).await?;
        store.delete("users", "2").await?;

        // reload from disk
        let reloaded = JsonFileStore::open(&tmp).await?;
        assert_eq!(reloaded.item_count("users"), 1);
        let alice = reloaded.get("users", "1").await?.unwrap_or_default();
        assert_eq!(alice.get("userHandle"), Some(&json!("alice")));
        assert!(!alice.contains_key("bio"));
        let by_handle = reloaded.query_index("users", "userHandle-index", "alice").await?;
        assert_eq!(by_handle.len(), 1);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("json_file_store_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, b"{not json").await?;
        assert!(matches!(JsonFileStore::open(&tmp).await, Err(StoreError::Serialization(_))));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
