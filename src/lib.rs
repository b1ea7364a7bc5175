//! Entryway user store.
//!
//! Re-exports the workspace crates and wires a provider from configuration:
//! a `JsonFileStore` when `store.data_file` is set, otherwise a `MemoryStore`.

use std::sync::Arc;

use tracing::info;

pub use common;
pub use configs;
pub use models;
pub use service;

pub use configs::ProviderConfig;
pub use models::{StrategyRecord, StrategyType, UserRecord};
pub use service::storage::{DocumentStore, JsonFileStore, MemoryStore};
pub use service::{Lookup, RemovalReport, ServiceError, StoreError, UserStoreProvider};

/// Provider over a store chosen at runtime.
pub type DynProvider = UserStoreProvider<dyn DocumentStore>;

/// Open the configured store and provision both tables.
pub async fn open_provider(cfg: ProviderConfig) -> Result<DynProvider, ServiceError> {
    let store: Arc<dyn DocumentStore> = match cfg.store.data_file.as_deref() {
        Some(path) => JsonFileStore::open(path).await?,
        None => Arc::new(MemoryStore::new()),
    };
    info!(
        backend = if cfg.store.data_file.is_some() { "json_file" } else { "memory" },
        region = %cfg.store.region,
        endpoint = %cfg.store.endpoint,
        password_algorithm = %cfg.password.algorithm,
        users_table = %cfg.store.users_table,
        strategies_table = %cfg.store.strategies_table,
        "store_opened"
    );
    let provider = UserStoreProvider::new(store, cfg);
    provider.provision().await?;
    Ok(provider)
}
