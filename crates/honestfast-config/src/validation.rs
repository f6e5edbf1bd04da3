//! Configuration validation

use crate::schema::{RawConfig, RawPlan};
use honestfast_api::{DeviceRole, FastingPlan, MAX_TARGET_HOURS};
use std::collections::HashSet;
use thiserror::Error;

/// Longest fast a plan may define
pub const MAX_PLAN_HOURS: f64 = MAX_TARGET_HOURS;

/// Allowed tick cadence, milliseconds
pub const TICK_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 100..=60_000;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Plan '{plan_id}': {message}")]
    PlanError { plan_id: String, message: String },

    #[error("Duplicate plan ID: {0}")]
    DuplicatePlanId(String),

    #[error("Unknown device '{0}' (expected \"phone\" or \"watch\")")]
    UnknownDevice(String),

    #[error("Tick interval {0}ms out of range (100..=60000)")]
    InvalidTickInterval(u64),

    #[error("Milestone {0}h out of range (1..=72)")]
    InvalidMilestone(u32),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(device) = &config.app.device
        && DeviceRole::parse(device).is_none()
    {
        errors.push(ValidationError::UnknownDevice(device.clone()));
    }

    if let Some(ms) = config.app.tick_interval_ms
        && !TICK_INTERVAL_RANGE_MS.contains(&ms)
    {
        errors.push(ValidationError::InvalidTickInterval(ms));
    }

    if let Some(hours) = &config.notifications.milestone_hours {
        for &h in hours {
            if h == 0 || f64::from(h) > MAX_PLAN_HOURS {
                errors.push(ValidationError::InvalidMilestone(h));
            }
        }
    }

    // Plan ids must be unique, built-ins included
    let mut seen_ids: HashSet<String> = FastingPlan::builtin()
        .into_iter()
        .map(|p| p.id.as_str().to_string())
        .collect();
    for plan in &config.plans {
        if !seen_ids.insert(plan.id.clone()) {
            errors.push(ValidationError::DuplicatePlanId(plan.id.clone()));
        }
    }

    for plan in &config.plans {
        errors.extend(validate_plan(plan));
    }

    errors
}

fn validate_plan(plan: &RawPlan) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let err = |message: &str| ValidationError::PlanError {
        plan_id: plan.id.clone(),
        message: message.into(),
    };

    if plan.id.trim().is_empty() {
        errors.push(err("id cannot be empty"));
    }

    if !plan.fast_hours.is_finite() || plan.fast_hours <= 0.0 {
        errors.push(err("fast_hours must be greater than 0"));
    } else if plan.fast_hours > MAX_PLAN_HOURS {
        errors.push(err("fast_hours cannot exceed 72"));
    }

    if let Some(eat) = plan.eat_hours
        && (!eat.is_finite() || eat < 0.0)
    {
        errors.push(err("eat_hours cannot be negative"));
    }

    errors
}
