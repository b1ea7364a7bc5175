use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

pub const ENV_REGION: &str = "ENTRYWAY_DYNAMODB_REGION";
pub const ENV_ENDPOINT: &str = "ENTRYWAY_DYNAMODB_ENDPOINT";

/// Password algorithms the provider can hash with. `argon2` is argon2id.
pub const SUPPORTED_PASSWORD_ALGORITHMS: &[&str] = &["argon2", "argon2id", "argon2i", "argon2d"];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub remove: RemoveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_users_table")]
    pub users_table: String,
    #[serde(default = "default_strategies_table")]
    pub strategies_table: String,
    #[serde(default = "default_user_handle_index")]
    pub user_handle_index: String,
    #[serde(default = "default_user_id_index")]
    pub user_id_index: String,
    /// Backing file for the JSON file store; unused by other stores.
    #[serde(default)]
    pub data_file: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            endpoint: String::new(),
            users_table: default_users_table(),
            strategies_table: default_strategies_table(),
            user_handle_index: default_user_handle_index(),
            user_id_index: default_user_id_index(),
            data_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    #[serde(default = "default_password_algorithm")]
    pub algorithm: String,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self { algorithm: default_password_algorithm() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveConfig {
    /// Strategy rows deleted at once during user removal; 1 keeps it strictly sequential.
    #[serde(default = "default_delete_concurrency")]
    pub delete_concurrency: usize,
}

impl Default for RemoveConfig {
    fn default() -> Self {
        Self { delete_concurrency: default_delete_concurrency() }
    }
}

fn default_users_table() -> String { "users".into() }
fn default_strategies_table() -> String { "strategies".into() }
fn default_user_handle_index() -> String { "userHandle-index".into() }
fn default_user_id_index() -> String { "userId-index".into() }
fn default_password_algorithm() -> String { "argon2".into() }
fn default_delete_concurrency() -> usize { 1 }

pub fn load_default() -> Result<ProviderConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<ProviderConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<ProviderConfig> {
    let cfg: ProviderConfig = toml::from_str(content)?;
    Ok(cfg)
}

fn is_missing_file(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ProviderConfig {
    /// Load from `CONFIG_PATH` (or `config.toml`), falling back to defaults when
    /// the file is missing, then apply env overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_missing_file(&e) => ProviderConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.store.normalize_from_env();
        self.store.validate()?;
        self.password.validate()?;
        self.remove.validate()?;
        Ok(())
    }
}

impl StoreConfig {
    pub fn normalize_from_env(&mut self) {
        if self.region.trim().is_empty() {
            if let Ok(region) = std::env::var(ENV_REGION) {
                self.region = region;
            }
        }
        if self.endpoint.trim().is_empty() {
            if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
                self.endpoint = endpoint;
            }
        }
        self.region = self.region.trim().to_string();
        self.endpoint = self.endpoint.trim().to_string();
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("store.users_table", &self.users_table),
            ("store.strategies_table", &self.strategies_table),
            ("store.user_handle_index", &self.user_handle_index),
            ("store.user_id_index", &self.user_id_index),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{name} must not be empty"));
            }
        }
        if self.users_table == self.strategies_table {
            return Err(anyhow!("store.users_table and store.strategies_table must differ"));
        }
        if !self.endpoint.is_empty() {
            let lower = self.endpoint.to_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(anyhow!("store.endpoint must start with http:// or https://"));
            }
        }
        Ok(())
    }
}

impl PasswordConfig {
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_PASSWORD_ALGORITHMS.contains(&self.algorithm.as_str()) {
            return Err(anyhow!("password.algorithm '{}' is not supported", self.algorithm));
        }
        Ok(())
    }
}

impl RemoveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.delete_concurrency == 0 {
            return Err(anyhow!("remove.delete_concurrency must be >= 1"));
        }
        Ok(())
    }
}
