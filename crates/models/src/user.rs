use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;
use crate::item::Item;
use crate::strategy::{StrategyRecord, StrategyType};

/// Attribute set by the user-schema library on its own objects; never loaded back.
pub const PROVIDER_ATTRIBUTE: &str = "provider";

/// Optional profile attributes, in update order.
pub const PROFILE_FIELDS: [&str; 5] = ["email", "location", "fullName", "bio", "avatar"];

/// A user identity as stored in the users table.
///
/// `id` is `None` until the user has been persisted. Optional profile fields
/// that are `None` are absent from the stored item; `Some("")` is stored as an
/// empty string. Unknown attributes are kept in `attributes` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub user_handle: String,
    #[serde(default)]
    pub strategies: Vec<StrategyRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub attributes: Item,
}

impl UserRecord {
    pub fn new(user_handle: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self { user_handle: user_handle.into(), tenant: tenant.into(), ..Self::default() }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.as_deref().map(|id| !id.is_empty()).unwrap_or(false)
    }

    pub fn strategy(&self, kind: &StrategyType) -> Option<&StrategyRecord> {
        self.strategies.iter().find(|s| &s.kind == kind)
    }

    pub fn strategy_mut(&mut self, kind: &StrategyType) -> Option<&mut StrategyRecord> {
        self.strategies.iter_mut().find(|s| &s.kind == kind)
    }

    /// Profile fields paired with their stored attribute names.
    pub fn profile_fields(&self) -> [(&'static str, Option<&str>); 5] {
        [
            (PROFILE_FIELDS[0], self.email.as_deref()),
            (PROFILE_FIELDS[1], self.location.as_deref()),
            (PROFILE_FIELDS[2], self.full_name.as_deref()),
            (PROFILE_FIELDS[3], self.bio.as_deref()),
            (PROFILE_FIELDS[4], self.avatar.as_deref()),
        ]
    }

    pub fn to_item(&self) -> Result<Item, ModelError> {
        match serde_json::to_value(self)? {
            Value::Object(mut map) => {
                map.remove(PROVIDER_ATTRIBUTE);
                Ok(map)
            }
            _ => Err(ModelError::validation("user did not serialize to an object")),
        }
    }

    /// Build a record from a stored item, skipping the `provider` attribute.
    pub fn from_item(mut item: Item) -> Result<Self, ModelError> {
        item.remove(PROVIDER_ATTRIBUTE);
        if !matches!(item.get("userHandle"), Some(Value::String(_))) {
            return Err(ModelError::validation("userHandle property has been removed, it is required"));
        }
        Ok(serde_json::from_value(Value::Object(item))?)
    }
}

/// Checks applied to a user before its first write.
pub fn validate_new_user(user: &UserRecord) -> Result<(), ModelError> {
    if user.user_handle.is_empty() {
        return Err(ModelError::validation("userHandle must have a value"));
    }
    if user.strategies.is_empty() {
        return Err(ModelError::validation("strategies collection has been removed, it is required"));
    }
    if user.strategies.len() > 1 {
        return Err(ModelError::validation("New users can only have one strategy"));
    }
    Ok(())
}
