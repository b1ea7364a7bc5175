use thiserror::Error;

use models::ModelError;

/// Failures raised by a `DocumentStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("index {index} not found on table {table}")]
    IndexNotFound { table: String, index: String },
    #[error("conditional check failed on {table} for key {key}")]
    ConditionFailed { table: String, key: String },
    #[error("item {key} not found in {table}")]
    NotFound { table: String, key: String },
    #[error("item for {table} is missing string key attribute {attribute}")]
    InvalidKey { table: String, attribute: String },
    #[error("backend error: {0}")]
    Backend(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the user store provider.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("User exists already with this user handle")]
    UserExists,
    #[error("This strategy is already in use")]
    StrategyInUse,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("removal of user {user_id} aborted; strategy rows not removed: {remaining:?}")]
    PartialRemoval {
        user_id: String,
        remaining: Vec<String>,
        source: StoreError,
    },
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 1001,
            ServiceError::UserExists => 1002,
            ServiceError::StrategyInUse => 1003,
            ServiceError::Hash(_) => 1101,
            ServiceError::Serialization(_) => 1102,
            ServiceError::Store(_) => 1200,
            ServiceError::PartialRemoval { .. } => 1201,
        }
    }
}

impl From<ModelError> for ServiceError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(msg) => ServiceError::Validation(msg),
            ModelError::Serialization(e) => ServiceError::Serialization(e),
        }
    }
}
