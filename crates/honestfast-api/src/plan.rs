//! Fasting plan catalog

use honestfast_util::PlanId;
use serde::{Deserialize, Serialize};

/// Plan used when nothing else is known (fresh install, malformed sync payload)
pub const DEFAULT_PLAN_ID: &str = "16:8";

/// Target used when a sync payload carries no usable duration
pub const DEFAULT_TARGET_HOURS: f64 = 16.0;

/// Id of the user-defined plan
pub const CUSTOM_PLAN_ID: &str = "Custom";

/// Longest target a fast may have, in hours
pub const MAX_TARGET_HOURS: f64 = 72.0;

/// Whether `hours` can be used as a fast target: finite, positive and at
/// most [`MAX_TARGET_HOURS`]
pub fn is_valid_target(hours: f64) -> bool {
    hours.is_finite() && hours > 0.0 && hours <= MAX_TARGET_HOURS
}

/// A fasting/eating schedule the user can pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingPlan {
    pub id: PlanId,
    pub name: String,
    pub fast_hours: f64,
    pub eat_hours: f64,
    pub description: String,
}

impl FastingPlan {
    pub fn new(
        id: impl Into<String>,
        fast_hours: f64,
        eat_hours: f64,
        description: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id: PlanId::new(id),
            fast_hours,
            eat_hours,
            description: description.into(),
        }
    }

    /// The built-in plans, in display order
    pub fn builtin() -> Vec<FastingPlan> {
        vec![
            FastingPlan::new("16:8", 16.0, 8.0, "The classic. Most popular."),
            FastingPlan::new("18:6", 18.0, 6.0, "Intermediate fasting."),
            FastingPlan::new("20:4", 20.0, 4.0, "The warrior diet."),
            FastingPlan::new("OMAD", 23.0, 1.0, "One meal a day."),
            FastingPlan::new(CUSTOM_PLAN_ID, 0.0, 0.0, "Set your own hours."),
        ]
    }

    /// Look up a built-in plan by id
    pub fn find_builtin(id: &str) -> Option<FastingPlan> {
        Self::builtin().into_iter().find(|p| p.id.as_str() == id)
    }

    /// A custom plan with user-chosen hours
    pub fn custom(fast_hours: f64, eat_hours: f64) -> Self {
        Self {
            fast_hours,
            eat_hours,
            ..Self::new(CUSTOM_PLAN_ID, 0.0, 0.0, "Set your own hours.")
        }
    }

    pub fn is_custom(&self) -> bool {
        self.id.as_str() == CUSTOM_PLAN_ID
    }

    /// Label stored on fast records, e.g. `16:8` or `Custom (14:10)`
    pub fn label(&self) -> String {
        if self.is_custom() {
            format!(
                "Custom ({}:{})",
                self.fast_hours.trunc() as i64,
                self.eat_hours.trunc() as i64
            )
        } else {
            self.name.clone()
        }
    }
}
