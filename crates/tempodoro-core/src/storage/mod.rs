mod config;
pub mod database;
pub mod kv;
pub mod session_log;

pub use config::{Config, MetronomeConfig, PomodoroConfig, SoundConfig};
pub use database::Database;
pub use kv::{KeyValueStore, MemoryStore};
pub use session_log::{HistoryFilter, HistorySummary, SessionLog, SessionRecord, SESSIONS_KEY};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `TEMPODORO_DATA_DIR` wins when set. Otherwise `~/.config/tempodoro[-dev]/`
/// based on `TEMPODORO_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TEMPODORO_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TEMPODORO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("tempodoro-dev")
            } else {
                base_dir.join("tempodoro")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
