use std::sync::Arc;

use futures::future::join_all;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use configs::ProviderConfig;
use models::item::string_attr;
use models::{strategy_key, Item, StrategyRecord, StrategyRow, StrategyType, UserRecord};

use super::domain::{Lookup, RemovalReport};
use crate::errors::{ServiceError, StoreError};
use crate::password;
use crate::storage::schema::{self, STRATEGY_KEY};
use crate::storage::{Condition, DocumentStore, UpdateExpression};

/// Stateless provider over a `DocumentStore` holding the `users` and
/// `strategies` tables.
///
/// Uniqueness of `(tenant, userHandle)` is a check-then-write and can be
/// raced by concurrent creates. Uniqueness of a strategy triple is enforced
/// by a conditional put on the strategies key.
pub struct UserStoreProvider<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    cfg: ProviderConfig,
}

impl<S: DocumentStore + ?Sized> UserStoreProvider<S> {
    pub fn new(store: Arc<S>, cfg: ProviderConfig) -> Self { Self { store, cfg } }

    pub fn config(&self) -> &ProviderConfig { &self.cfg }

    pub fn store(&self) -> &Arc<S> { &self.store }

    fn users_table(&self) -> &str { &self.cfg.store.users_table }

    fn strategies_table(&self) -> &str { &self.cfg.store.strategies_table }

    /// Create both tables and their indexes if they do not exist yet.
    pub async fn provision(&self) -> Result<(), ServiceError> {
        schema::provision(self.store.as_ref(), &self.cfg.store).await?;
        Ok(())
    }

    /// Persist a new user and mirror its single strategy into the strategies table.
    ///
    /// A failed strategy-row write after the user write is not rolled back.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::provider::UserStoreProvider;
    /// use service::storage::MemoryStore;
    /// use models::{StrategyRecord, UserRecord};
    /// let provider = UserStoreProvider::new(Arc::new(MemoryStore::new()), configs::ProviderConfig::default());
    /// tokio_test::block_on(provider.provision()).unwrap();
    /// let mut user = UserRecord::new("reader", "");
    /// user.strategies.push(StrategyRecord::new("POCKET", "reader", "TEST_TOKEN"));
    /// let created = tokio_test::block_on(provider.create(user)).unwrap();
    /// assert!(created.is_persisted());
    /// ```
    #[instrument(skip(self, user), fields(tenant = %user.tenant, user_handle = %user.user_handle))]
    pub async fn create(&self, mut user: UserRecord) -> Result<UserRecord, ServiceError> {
        self.check_new_user(&user).await?;

        let id = Uuid::new_v4().to_string();
        user.id = Some(id.clone());
        self.store.put(self.users_table(), user.to_item()?, None).await?;

        let strategy = user
            .strategies
            .first()
            .ok_or_else(|| ServiceError::validation("strategies collection has been removed, it is required"))?;
        let row = StrategyRow::for_user(&id, &user.tenant, strategy);
        if let Err(e) = self.put_strategy_row(&row).await {
            warn!(user_id = %id, key = %row.key, error = %e, "user row written without its strategy row");
            return Err(e);
        }

        info!(user_id = %id, strategy_type = %row.kind, "user_created");
        Ok(user)
    }

    /// Load a user by primary key.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> Result<Lookup, ServiceError> {
        let item = self.store.get(self.users_table(), id).await?;
        debug!(found = item.is_some(), "user lookup");
        Ok(item.map(UserRecord::from_item).transpose()?.into())
    }

    /// Load the owner of the strategy `(tenant, kind, strategy_id)`.
    #[instrument(skip(self))]
    pub async fn get_by_strategy(&self, kind: &StrategyType, strategy_id: &str, tenant: &str) -> Result<Lookup, ServiceError> {
        match self.find_strategy_row(kind, strategy_id, tenant).await? {
            Some(row) => self.get_by_id(&row.user_id).await,
            None => Ok(Lookup::NotFound),
        }
    }

    /// Log in through the `LOCAL` strategy. Any mismatch is `NotFound`.
    #[instrument(skip(self, password))]
    pub async fn password_login(&self, user_handle: &str, password: &str, tenant: &str) -> Result<Lookup, ServiceError> {
        let Some(row) = self.find_strategy_row(&StrategyType::LOCAL, user_handle, tenant).await? else {
            return Ok(Lookup::NotFound);
        };
        match password::verify_password(password, &row.token).await {
            Ok(true) => self.get_by_id(&row.user_id).await,
            Ok(false) => {
                debug!("password mismatch");
                Ok(Lookup::NotFound)
            }
            Err(ServiceError::Hash(reason)) => {
                warn!(key = %row.key, %reason, "stored LOCAL token is not a password hash");
                Ok(Lookup::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    /// Log in through an external strategy.
    ///
    /// A token that differs from the stored one is taken as a refresh: the
    /// embedded strategy and the strategy row are both rewritten.
    #[instrument(skip(self, access_token))]
    pub async fn strategy_login(
        &self,
        user_handle: &str,
        kind: &StrategyType,
        access_token: &str,
        tenant: &str,
    ) -> Result<Lookup, ServiceError> {
        let Some(mut row) = self.find_strategy_row(kind, user_handle, tenant).await? else {
            return Ok(Lookup::NotFound);
        };
        if bool::from(row.token.as_bytes().ct_eq(access_token.as_bytes())) {
            return self.get_by_id(&row.user_id).await;
        }

        let mut user = match self.get_by_id(&row.user_id).await? {
            Lookup::Found(user) => user,
            Lookup::NotFound => {
                warn!(user_id = %row.user_id, key = %row.key, "strategy row points at a missing user");
                return Ok(Lookup::NotFound);
            }
        };
        match user.strategy_mut(kind) {
            Some(strategy) => strategy.token = access_token.to_string(),
            None => user.strategies.push(StrategyRecord::new(kind.clone(), user_handle, access_token)),
        }
        self.update(&user).await?;

        row.token = access_token.to_string();
        self.store.put(self.strategies_table(), row.to_item()?, None).await?;
        info!(user_id = %row.user_id, "strategy_token_refreshed");
        Ok(Lookup::Found(user))
    }

    /// Rewrite the handle, embedded strategies and profile fields.
    ///
    /// Profile fields that are `None` are removed from the stored item.
    /// Returns the attributes written.
    #[instrument(skip(self, user), fields(user_id = ?user.id))]
    pub async fn update(&self, user: &UserRecord) -> Result<Item, ServiceError> {
        let id = persisted_id(user, "cannot update an unpersisted user")?;
        // tenant and id are immutable once created
        let mut expr = UpdateExpression::new()
            .set("userHandle", user.user_handle.as_str())
            .set("strategies", serde_json::to_value(&user.strategies)?);
        for (attribute, value) in user.profile_fields() {
            expr = expr.set_or_remove(attribute, value);
        }
        // placeholder names only; values carry strategy tokens
        debug!(
            expression = %expr,
            names = ?expr.attribute_names(),
            values = ?expr.attribute_values().keys().collect::<Vec<_>>(),
            removed = ?expr.removed(),
            "user update"
        );
        Ok(self.store.update(self.users_table(), id, &expr).await?)
    }

    /// Check that `user` may take on a strategy of `kind` identified by `user_handle`.
    #[instrument(skip(self, user), fields(tenant = %user.tenant))]
    pub async fn validate_adding_new_strategy(
        &self,
        kind: &StrategyType,
        user_handle: &str,
        user: &UserRecord,
    ) -> Result<(), ServiceError> {
        if !user.strategies.is_empty() && !user.is_persisted() {
            return Err(ServiceError::validation("An unpersisted user cannot have more than one strategy"));
        }
        if user.strategy(kind).is_some() {
            return Err(ServiceError::validation("A user cannot have two strategies of the same type"));
        }
        self.ensure_strategy_unclaimed(kind, user_handle, &user.tenant).await
    }

    /// Delete every strategy row of the user, then the user item.
    ///
    /// Rows are deleted `remove.delete_concurrency` at a time (one by
    /// default). The first failure stops the removal and reports the keys
    /// left behind; nothing already deleted is restored.
    #[instrument(skip(self, user), fields(user_id = ?user.id))]
    pub async fn remove(&self, user: &UserRecord) -> Result<RemovalReport, ServiceError> {
        let user_id = persisted_id(user, "cannot remove an unpersisted user")?;
        let rows = self
            .store
            .query_index(self.strategies_table(), &self.cfg.store.user_id_index, user_id)
            .await?;
        let keys: Vec<String> = rows.iter().filter_map(|r| string_attr(r, STRATEGY_KEY)).map(str::to_string).collect();

        self.delete_strategy_rows(user_id, &keys).await?;

        if let Err(source) = self.store.delete(self.users_table(), user_id).await {
            if keys.is_empty() {
                return Err(source.into());
            }
            warn!(error = %source, "strategy rows removed but user item kept");
            return Err(ServiceError::PartialRemoval { user_id: user_id.to_string(), remaining: Vec::new(), source });
        }

        info!(strategy_rows = keys.len(), "user_removed");
        Ok(RemovalReport { user_id: user_id.to_string(), strategy_keys_removed: keys })
    }

    /// Create the user when unpersisted, otherwise update it.
    pub async fn save(&self, user: UserRecord) -> Result<UserRecord, ServiceError> {
        if user.is_persisted() {
            self.update(&user).await?;
            Ok(user)
        } else {
            self.create(user).await
        }
    }

    /// Attach a strategy to the user.
    ///
    /// Unpersisted users only carry it in memory until `create`; persisted
    /// users get the strategy row and the embedded list written immediately.
    #[instrument(skip(self, user, strategy), fields(tenant = %user.tenant, strategy_type = %strategy.kind))]
    pub async fn add_strategy(&self, mut user: UserRecord, strategy: StrategyRecord) -> Result<UserRecord, ServiceError> {
        ensure_local_token_hashed(&strategy)?;
        self.validate_adding_new_strategy(&strategy.kind, &strategy.id, &user).await?;
        if !user.is_persisted() {
            user.strategies.push(strategy);
            return Ok(user);
        }

        let user_id = persisted_id(&user, "cannot add a strategy to an unpersisted user")?.to_string();
        let row = StrategyRow::for_user(&user_id, &user.tenant, &strategy);
        self.put_strategy_row(&row).await?;
        user.strategies.push(strategy);
        self.update(&user).await?;
        info!(%user_id, key = %row.key, "strategy_added");
        Ok(user)
    }

    /// Build a `LOCAL` strategy whose token is the argon2 hash of `password`.
    pub async fn local_strategy(&self, user_handle: &str, password: &str) -> Result<StrategyRecord, ServiceError> {
        if password.is_empty() {
            return Err(ServiceError::validation("password must have a value"));
        }
        let hash = password::hash_password(password, &self.cfg.password.algorithm).await?;
        Ok(StrategyRecord::new(StrategyType::LOCAL, user_handle, hash))
    }

    /// Hash `password` and attach it as the user's `LOCAL` strategy.
    pub async fn add_local_strategy(&self, user: UserRecord, user_handle: &str, password: &str) -> Result<UserRecord, ServiceError> {
        let strategy = self.local_strategy(user_handle, password).await?;
        self.add_strategy(user, strategy).await
    }

    async fn check_new_user(&self, user: &UserRecord) -> Result<(), ServiceError> {
        models::validate_new_user(user)?;
        user.strategies.iter().try_for_each(ensure_local_token_hashed)?;
        if self.find_by_user_handle(&user.user_handle, &user.tenant).await?.is_some() {
            return Err(ServiceError::UserExists);
        }
        if let Some(strategy) = user.strategies.first() {
            self.ensure_strategy_unclaimed(&strategy.kind, &strategy.id, &user.tenant).await?;
        }
        Ok(())
    }

    /// Query the handle index, then keep the item in the requested tenant.
    async fn find_by_user_handle(&self, user_handle: &str, tenant: &str) -> Result<Option<Item>, ServiceError> {
        let items = self
            .store
            .query_index(self.users_table(), &self.cfg.store.user_handle_index, user_handle)
            .await?;
        Ok(items.into_iter().find(|item| string_attr(item, "tenant").unwrap_or("") == tenant))
    }

    async fn find_strategy_row(&self, kind: &StrategyType, strategy_id: &str, tenant: &str) -> Result<Option<StrategyRow>, ServiceError> {
        let key = strategy_key(tenant, strategy_id, kind);
        let item = match self.store.get(self.strategies_table(), &key).await {
            Ok(item) => item,
            Err(e) => {
                error!(%key, error = %e, "strategy lookup failed");
                return Err(e.into());
            }
        };
        debug!(%key, found = item.is_some(), "strategy lookup");
        Ok(item.map(StrategyRow::from_item).transpose()?)
    }

    async fn ensure_strategy_unclaimed(&self, kind: &StrategyType, strategy_id: &str, tenant: &str) -> Result<(), ServiceError> {
        match self.find_strategy_row(kind, strategy_id, tenant).await? {
            Some(_) => Err(ServiceError::StrategyInUse),
            None => Ok(()),
        }
    }

    async fn put_strategy_row(&self, row: &StrategyRow) -> Result<(), ServiceError> {
        let condition = Condition::AttributeNotExists(STRATEGY_KEY.to_string());
        match self.store.put(self.strategies_table(), row.to_item()?, Some(condition)).await {
            Ok(()) => Ok(()),
            Err(StoreError::ConditionFailed { .. }) => Err(ServiceError::StrategyInUse),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_strategy_rows(&self, user_id: &str, keys: &[String]) -> Result<(), ServiceError> {
        let width = self.cfg.remove.delete_concurrency.max(1);
        for (n, chunk) in keys.chunks(width).enumerate() {
            let results = join_all(chunk.iter().map(|key| self.store.delete(self.strategies_table(), key))).await;

            let mut remaining = Vec::new();
            let mut first_error = None;
            for (key, result) in chunk.iter().zip(results) {
                if let Err(e) = result {
                    remaining.push(key.clone());
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
            if let Some(source) = first_error {
                remaining.extend(keys.iter().skip((n + 1) * width).cloned());
                warn!(%user_id, remaining = remaining.len(), error = %source, "strategy row removal aborted");
                return Err(ServiceError::PartialRemoval { user_id: user_id.to_string(), remaining, source });
            }
        }
        Ok(())
    }
}

/// `LOCAL` tokens are stored as PHC hashes; anything else could never log in.
fn ensure_local_token_hashed(strategy: &StrategyRecord) -> Result<(), ServiceError> {
    if strategy.kind.is_local() && !password::is_password_hash(&strategy.token) {
        return Err(ServiceError::validation("LOCAL strategy token must be a password hash"));
    }
    Ok(())
}

fn persisted_id<'a>(user: &'a UserRecord, msg: &str) -> Result<&'a str, ServiceError> {
    user.id.as_deref().filter(|id| !id.is_empty()).ok_or_else(|| ServiceError::validation(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn provider() -> Result<UserStoreProvider<MemoryStore>, ServiceError> {
        let provider = UserStoreProvider::new(Arc::new(MemoryStore::new()), ProviderConfig::default());
        provider.provision().await?;
        Ok(provider)
    }

    fn pocket_user(handle: &str, tenant: &str) -> UserRecord {
        let mut user = UserRecord::new(handle, tenant);
        user.strategies.push(StrategyRecord::new("POCKET", handle, "TEST_TOKEN"));
        user
    }

    #[tokio::test]
    async fn create_writes_user_and_strategy_rows() -> Result<(), anyhow::Error> {
        let provider = provider().await?;
        let user = provider.create(pocket_user("reader", "T1")).await?;

        let id = user.id.clone().unwrap_or_default();
        assert_eq!(provider.store().item_count("users"), 1);
        let row = provider.store().get("strategies", "T1#:#reader#:#POCKET").await?.unwrap_or_default();
        assert_eq!(string_attr(&row, "userId"), Some(id.as_str()));
        assert_eq!(string_attr(&row, "tenant"), Some("T1"));
        assert_eq!(string_attr(&row, "token"), Some("TEST_TOKEN"));
        Ok(())
    }

    #[tokio::test]
    async fn update_requires_persisted_user() -> Result<(), anyhow::Error> {
        let provider = provider().await?;
        let err = provider.update(&pocket_user("reader", "")).await.unwrap_err();
        assert_eq!(err.to_string(), "cannot update an unpersisted user");
        let err = provider.remove(&pocket_user("reader", "")).await.unwrap_err();
        assert_eq!(err.to_string(), "cannot remove an unpersisted user");
        Ok(())
    }

    #[tokio::test]
    async fn update_returns_written_attributes() -> Result<(), anyhow::Error> {
        let provider = provider().await?;
        let mut user = provider.create(pocket_user("reader", "")).await?;
        user.email = Some("reader@example.com".into());
        let written = provider.update(&user).await?;
        assert_eq!(string_attr(&written, "email"), Some("reader@example.com"));
        assert_eq!(string_attr(&written, "userHandle"), Some("reader"));
        assert!(!written.contains_key("tenant"));
        assert!(!written.contains_key("id"));
        Ok(())
    }

    #[tokio::test]
    async fn save_dispatches_on_persistence() -> Result<(), anyhow::Error> {
        let provider = provider().await?;
        let mut user = provider.save(pocket_user("reader", "")).await?;
        assert!(user.is_persisted());

        user.full_name = Some("Pocket Reader".into());
        let user = provider.save(user).await?;
        let loaded = provider.get_by_id(user.id.as_deref().unwrap_or_default()).await?;
        assert_eq!(loaded.user().and_then(|u| u.full_name.as_deref()), Some("Pocket Reader"));
        assert_eq!(provider.store().item_count("users"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn local_strategy_rejects_empty_password() -> Result<(), anyhow::Error> {
        let provider = provider().await?;
        let err = provider.local_strategy("bob", "").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let strategy = provider.local_strategy("bob", "pw").await?;
        assert!(strategy.kind.is_local());
        assert_ne!(strategy.token, "pw");
        Ok(())
    }

    #[tokio::test]
    async fn local_strategy_hashes_with_configured_variant() -> Result<(), anyhow::Error> {
        let mut cfg = ProviderConfig::default();
        cfg.password.algorithm = "argon2i".into();
        let provider = UserStoreProvider::new(Arc::new(MemoryStore::new()), cfg);
        let strategy = provider.local_strategy("bob", "pw").await?;
        assert!(strategy.token.starts_with("$argon2i$"));
        Ok(())
    }

    #[tokio::test]
    async fn plain_local_token_is_rejected_on_write() -> Result<(), anyhow::Error> {
        let provider = provider().await?;
        let mut user = UserRecord::new("carol", "");
        user.strategies.push(StrategyRecord::new("LOCAL", "carol", "secret"));
        let err = provider.create(user).await.unwrap_err();
        assert_eq!(err.to_string(), "LOCAL strategy token must be a password hash");

        let user = provider.create(pocket_user("dave", "")).await?;
        let err = provider
            .add_strategy(user, StrategyRecord::new(StrategyType::LOCAL, "dave", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(provider.store().item_count("strategies"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_stored_hash_is_not_found() -> Result<(), anyhow::Error> {
        let provider = provider().await?;
        let user = provider.create(pocket_user("carol", "")).await?;
        // written behind the provider's back, bypassing the hash check
        let row = StrategyRow::for_user(
            user.id.as_deref().unwrap_or_default(),
            "",
            &StrategyRecord::new(StrategyType::LOCAL, "carol", "secret"),
        );
        provider.store().put("strategies", row.to_item()?, None).await?;

        assert_eq!(provider.password_login("carol", "wrong", "").await?, Lookup::NotFound);
        assert_eq!(provider.password_login("carol", "secret", "").await?, Lookup::NotFound);
        Ok(())
    }
}
