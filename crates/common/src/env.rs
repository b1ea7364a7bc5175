//! Environment helpers
//!
//! Loads `.env` so that `RUST_LOG`, `CONFIG_PATH` and the
//! `ENTRYWAY_DYNAMODB_*` overrides are visible to the config loader.

use tracing::debug;

/// Load `.env` from the working directory if present.
/// Returns whether a file was found.
pub fn load_dotenv() -> bool {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env");
            true
        }
        Err(_) => false,
    }
}

/// Read a boolean flag from the environment (`1`, `true`, `yes`, `on`).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
