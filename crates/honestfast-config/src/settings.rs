//! Validated settings structures

use crate::schema::{RawAppConfig, RawConfig, RawPlan};
use honestfast_api::{DeviceRole, FastingPlan};
use honestfast_util::{default_data_dir, shared_state_path};
use std::path::PathBuf;
use std::time::Duration;

/// Hours at which milestone reminders fire unless configured otherwise
pub const DEFAULT_MILESTONE_HOURS: [u32; 6] = [4, 8, 12, 16, 20, 24];

/// Timer refresh cadence unless configured otherwise
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Validated configuration ready for use by the engine and the CLI
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,

    /// Milestone reminder hours, ascending and deduplicated
    pub milestone_hours: Vec<u32>,

    /// Built-in plans followed by configured ones
    pub plans: Vec<FastingPlan>,
}

impl AppConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let mut milestone_hours = raw
            .notifications
            .milestone_hours
            .unwrap_or_else(|| DEFAULT_MILESTONE_HOURS.to_vec());
        milestone_hours.sort_unstable();
        milestone_hours.dedup();

        let mut plans = FastingPlan::builtin();
        plans.extend(raw.plans.into_iter().map(convert_plan));

        Self {
            app: AppSettings::from_raw(raw.app),
            milestone_hours,
            plans,
        }
    }

    /// Get plan by ID
    pub fn get_plan(&self, id: &str) -> Option<&FastingPlan> {
        self.plans.iter().find(|p| p.id.as_str() == id)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings::default(),
            milestone_hours: DEFAULT_MILESTONE_HOURS.to_vec(),
            plans: FastingPlan::builtin(),
        }
    }
}

/// Device and storage settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub device: DeviceRole,
    pub data_dir: PathBuf,
    /// Explicit shared blob location; `None` means inside `data_dir`
    pub shared_state_path: Option<PathBuf>,
    pub tick_interval: Duration,
}

impl AppSettings {
    fn from_raw(raw: RawAppConfig) -> Self {
        Self {
            device: raw
                .device
                .as_deref()
                .and_then(DeviceRole::parse)
                .unwrap_or_default(),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            shared_state_path: raw.shared_state_path,
            tick_interval: raw
                .tick_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TICK_INTERVAL),
        }
    }

    /// Where the shared state blob lives
    pub fn shared_state_path(&self) -> PathBuf {
        self.shared_state_path
            .clone()
            .unwrap_or_else(|| shared_state_path(&self.data_dir))
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            device: DeviceRole::default(),
            data_dir: default_data_dir(),
            shared_state_path: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

fn convert_plan(raw: RawPlan) -> FastingPlan {
    let eat_hours = raw
        .eat_hours
        .unwrap_or_else(|| (24.0 - raw.fast_hours).max(0.0));
    let mut plan = FastingPlan::new(raw.id, raw.fast_hours, eat_hours, raw.description);
    if let Some(name) = raw.name {
        plan.name = name;
    }
    plan
}
