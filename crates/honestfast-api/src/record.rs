//! Fast records and derived timer readings

use chrono::{DateTime, Local};
use honestfast_util::{FastId, SECS_PER_HOUR, hours_to_duration};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::FastingStage;

/// One fasting attempt, bounded by a start and an optional end.
///
/// `start_time` is fixed at construction and `end_time` can be set only
/// once, through [`FastRecord::finish`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastRecord {
    id: FastId,
    start_time: DateTime<Local>,
    end_time: Option<DateTime<Local>>,
    target_hours: f64,
    plan_label: String,
    completed: bool,
}

impl FastRecord {
    /// Start a new, active fast
    pub fn new(start_time: DateTime<Local>, target_hours: f64, plan_label: impl Into<String>) -> Self {
        Self {
            id: FastId::new(),
            start_time,
            end_time: None,
            target_hours,
            plan_label: plan_label.into(),
            completed: false,
        }
    }

    /// Rebuild a record from persisted fields
    pub fn from_parts(
        id: FastId,
        start_time: DateTime<Local>,
        end_time: Option<DateTime<Local>>,
        target_hours: f64,
        plan_label: impl Into<String>,
        completed: bool,
    ) -> Self {
        Self {
            id,
            start_time,
            end_time,
            target_hours,
            plan_label: plan_label.into(),
            completed,
        }
    }

    pub fn id(&self) -> FastId {
        self.id
    }

    pub fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Local>> {
        self.end_time
    }

    pub fn target_hours(&self) -> f64 {
        self.target_hours
    }

    pub fn plan_label(&self) -> &str {
        &self.plan_label
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Close the fast. Returns false (and changes nothing) if it was already closed.
    pub fn finish(&mut self, end_time: DateTime<Local>, completed: bool) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        self.end_time = Some(end_time);
        self.completed = completed;
        true
    }

    /// When the target is reached, `None` if that instant is outside the
    /// representable calendar range
    pub fn target_end(&self) -> Option<DateTime<Local>> {
        self.start_time
            .checked_add_signed(hours_to_duration(self.target_hours))
    }

    /// `(end ?? now) - start`, never negative
    pub fn duration(&self, now: DateTime<Local>) -> chrono::Duration {
        let end = self.end_time.unwrap_or(now);
        end.signed_duration_since(self.start_time)
            .max(chrono::Duration::zero())
    }

    pub fn duration_hours(&self, now: DateTime<Local>) -> f64 {
        millis_to_hours(self.duration(now).num_milliseconds())
    }

    /// Fraction of the target reached, in `[0, 1]`. Always 0 for a non-positive target.
    pub fn progress(&self, now: DateTime<Local>) -> f64 {
        let target_ms = target_millis(self.target_hours);
        if target_ms <= 0 {
            return 0.0;
        }
        let elapsed_ms = self.duration(now).num_milliseconds();
        if elapsed_ms >= target_ms {
            return 1.0;
        }
        (elapsed_ms as f64 / target_ms as f64).clamp(0.0, 1.0)
    }

    /// Time left until the target, floored at zero
    pub fn time_remaining(&self, now: DateTime<Local>) -> chrono::Duration {
        let target = chrono::Duration::milliseconds(target_millis(self.target_hours));
        (target - self.duration(now)).max(chrono::Duration::zero())
    }

    pub fn hit_target(&self, now: DateTime<Local>) -> bool {
        self.duration(now).num_milliseconds() >= target_millis(self.target_hours)
    }

    pub fn stage(&self, now: DateTime<Local>) -> FastingStage {
        FastingStage::for_hours(self.duration_hours(now))
    }

    /// All derived values at once
    pub fn reading(&self, now: DateTime<Local>) -> TimerReading {
        TimerReading {
            elapsed: self.duration(now).to_std().unwrap_or(Duration::ZERO),
            remaining: self.time_remaining(now).to_std().unwrap_or(Duration::ZERO),
            progress: self.progress(now),
            stage: self.stage(now),
            target_hours: self.target_hours,
        }
    }
}

/// Derived values of a fast at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerReading {
    pub elapsed: Duration,
    pub remaining: Duration,
    pub progress: f64,
    pub stage: FastingStage,
    pub target_hours: f64,
}

impl TimerReading {
    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed.as_secs_f64() / SECS_PER_HOUR
    }

    pub fn is_target_reached(&self) -> bool {
        self.remaining.is_zero()
    }
}

fn target_millis(target_hours: f64) -> i64 {
    if !target_hours.is_finite() || target_hours <= 0.0 {
        return 0;
    }
    hours_to_duration(target_hours).num_milliseconds()
}

fn millis_to_hours(ms: i64) -> f64 {
    ms as f64 / 1000.0 / SECS_PER_HOUR
}
