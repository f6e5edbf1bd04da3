//! Shared types for honestfast

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DEFAULT_PLAN_ID;

/// Where the engine is in a fast's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FastState {
    /// No fast running
    #[default]
    Idle,
    /// A fast is running (record has no end time)
    Active,
    /// The fast reached its target and was closed; waiting to be dismissed
    Complete,
}

impl fmt::Display for FastState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FastState::Idle => "idle",
            FastState::Active => "active",
            FastState::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Which of the two participating devices a process runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    #[default]
    Phone,
    Watch,
}

impl DeviceRole {
    /// Tie-break priority for snapshots carrying the same sync timestamp.
    /// Higher wins.
    pub fn priority(self) -> u8 {
        match self {
            DeviceRole::Phone => 1,
            DeviceRole::Watch => 0,
        }
    }

    /// The other participant
    pub fn peer(self) -> Self {
        match self {
            DeviceRole::Phone => DeviceRole::Watch,
            DeviceRole::Watch => DeviceRole::Phone,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "phone" => Some(DeviceRole::Phone),
            "watch" => Some(DeviceRole::Watch),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRole::Phone => f.write_str("phone"),
            DeviceRole::Watch => f.write_str("watch"),
        }
    }
}

/// Display theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    System,
}

/// User preferences singleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Plan preselected when starting a fast
    pub default_plan: String,

    /// Preferred time of day for a "start your fast" reminder.
    ///
    /// Stored and round-tripped only. No daily reminder is scheduled from
    /// it; the engine schedules per-fast reminders alone.
    pub reminder_time: Option<NaiveTime>,

    /// Preferred time of day for an "eating window opens" reminder. Stored
    /// only, like `reminder_time`.
    pub eating_reminder_time: Option<NaiveTime>,

    /// Master switch for every reminder
    pub notifications_enabled: bool,

    /// Elapsed-hour milestone reminders
    pub milestone_notifications: bool,

    pub theme: Theme,
    pub is_pro: bool,
    pub has_completed_onboarding: bool,
    pub has_seen_pro_screen: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_plan: DEFAULT_PLAN_ID.to_string(),
            reminder_time: None,
            eating_reminder_time: None,
            notifications_enabled: true,
            milestone_notifications: true,
            theme: Theme::Dark,
            is_pro: false,
            has_completed_onboarding: false,
            has_seen_pro_screen: false,
        }
    }
}
