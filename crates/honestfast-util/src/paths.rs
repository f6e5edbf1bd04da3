//! Default paths for honestfast components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/honestfast/config.toml` or `~/.config/honestfast/config.toml`
//! - Data: `$XDG_DATA_HOME/honestfast` or `~/.local/share/honestfast`
//! - Shared state blob: `<data dir>/shared.json`

use std::path::{Path, PathBuf};

/// Environment variable for overriding the data directory
pub const HONESTFAST_DATA_DIR_ENV: &str = "HONESTFAST_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "honestfast";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Database filename within the data directory
const DB_FILENAME: &str = "honestfast.db";

/// Shared key-value blob filename within the data directory
const SHARED_STATE_FILENAME: &str = "shared.json";

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/tmp").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$HONESTFAST_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/honestfast` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/honestfast` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(HONESTFAST_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the HONESTFAST_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Database path inside a data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILENAME)
}

/// Shared state blob path inside a data directory
pub fn shared_state_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SHARED_STATE_FILENAME)
}
