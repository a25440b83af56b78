mod config;
pub mod database;
mod hooks;

pub use config::{AccountConfig, Config, TimerConfig};
pub use database::{Database, OverworkRecord, SessionRecord, Stats};
pub use hooks::DbHooks;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/pomocycle[-dev]/` based on POMOCYCLE_ENV.
///
/// Set POMOCYCLE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMOCYCLE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomocycle-dev")
    } else {
        base_dir.join("pomocycle")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
