//! Domain records persisted by the user store provider.

pub mod errors;
pub mod item;
pub mod strategy;
pub mod user;

pub use errors::ModelError;
pub use item::Item;
pub use strategy::{strategy_key, StrategyRecord, StrategyRow, StrategyType, KEY_DELIMITER};
pub use user::{validate_new_user, UserRecord};
