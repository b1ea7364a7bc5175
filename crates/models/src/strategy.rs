//! Login strategies: the embedded record, the standalone lookup row and the
//! composite key that ties them together.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::item::Item;

/// Separator between the segments of a strategy key.
pub const KEY_DELIMITER: &str = "#:#";

/// Kind of login strategy. `LOCAL` is password based, anything else is an
/// external provider tag such as `TWITTER` or `POCKET`.
///
/// The tag is always trimmed and upper-case, whichever way the value was
/// built, so kinds compare equal before and after a store round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StrategyType(Cow<'static, str>);

impl StrategyType {
    pub const LOCAL: StrategyType = StrategyType(Cow::Borrowed("LOCAL"));

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn is_local(&self) -> bool { self.as_str() == "LOCAL" }
}

impl From<&str> for StrategyType {
    fn from(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_uppercase();
        if tag == "LOCAL" { StrategyType::LOCAL } else { StrategyType(Cow::Owned(tag)) }
    }
}

impl From<String> for StrategyType {
    fn from(tag: String) -> Self { StrategyType::from(tag.as_str()) }
}

impl From<StrategyType> for String {
    fn from(kind: StrategyType) -> Self { kind.0.into_owned() }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Build the composite partition key `[tenant#:#]strategyId#:#strategyType`.
/// The tenant segment is dropped entirely for the empty tenant.
pub fn strategy_key(tenant: &str, strategy_id: &str, kind: &StrategyType) -> String {
    let mut key = String::new();
    if !tenant.is_empty() {
        key.push_str(tenant);
        key.push_str(KEY_DELIMITER);
    }
    key.push_str(strategy_id);
    key.push_str(KEY_DELIMITER);
    key.push_str(kind.as_str());
    key
}

/// Strategy as embedded in the user item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRecord {
    #[serde(rename = "type")]
    pub kind: StrategyType,
    pub id: String,
    pub token: String,
}

impl StrategyRecord {
    pub fn new(kind: impl Into<StrategyType>, id: impl Into<String>, token: impl Into<String>) -> Self {
        Self { kind: kind.into(), id: id.into(), token: token.into() }
    }

    pub fn key(&self, tenant: &str) -> String { strategy_key(tenant, &self.id, &self.kind) }
}

/// Denormalised row in the strategies table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRow {
    pub key: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StrategyType,
    pub user_id: String,
    #[serde(default)]
    pub tenant: String,
    pub token: String,
}

impl StrategyRow {
    pub fn for_user(user_id: &str, tenant: &str, strategy: &StrategyRecord) -> Self {
        Self {
            key: strategy.key(tenant),
            id: strategy.id.clone(),
            kind: strategy.kind.clone(),
            user_id: user_id.to_string(),
            tenant: tenant.to_string(),
            token: strategy.token.clone(),
        }
    }

    pub fn to_item(&self) -> Result<Item, ModelError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(ModelError::validation("strategy row did not serialize to an object")),
        }
    }

    pub fn from_item(item: Item) -> Result<Self, ModelError> {
        Ok(serde_json::from_value(serde_json::Value::Object(item))?)
    }
}
