//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Device and storage settings
    #[serde(default)]
    pub app: RawAppConfig,

    /// Reminder settings
    #[serde(default)]
    pub notifications: RawNotificationConfig,

    /// Extra plans offered next to the built-in catalog
    #[serde(default)]
    pub plans: Vec<RawPlan>,
}

/// App-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAppConfig {
    /// "phone" (default) or "watch"
    pub device: Option<String>,

    /// Data directory for the record store
    pub data_dir: Option<PathBuf>,

    /// Shared state blob (default: `<data_dir>/shared.json`)
    pub shared_state_path: Option<PathBuf>,

    /// Timer refresh cadence in milliseconds
    pub tick_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotificationConfig {
    /// Elapsed hours at which a milestone reminder fires
    pub milestone_hours: Option<Vec<u32>>,
}

/// Raw plan definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPlan {
    /// Unique stable ID, also used as the record label
    pub id: String,

    /// Display name (defaults to the id)
    pub name: Option<String>,

    pub fast_hours: f64,

    /// Defaults to the rest of the day
    pub eat_hours: Option<f64>,

    #[serde(default)]
    pub description: String,
}
