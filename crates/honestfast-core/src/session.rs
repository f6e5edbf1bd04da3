//! Active fast tracking

use chrono::{DateTime, Local};
use honestfast_api::{FastRecord, FastingStage, TimerReading};
use honestfast_util::FastId;
use std::time::Duration;

/// The fast currently running on this device
#[derive(Debug, Clone)]
pub struct ActiveFast {
    /// The open record (no end time)
    pub record: FastRecord,

    /// Last stage reported through `StageChanged`
    pub last_stage: FastingStage,
}

impl ActiveFast {
    /// Track an open record. The stage it is in at `now` counts as already seen.
    pub fn new(record: FastRecord, now: DateTime<Local>) -> Self {
        let last_stage = record.stage(now);
        Self { record, last_stage }
    }

    pub fn id(&self) -> FastId {
        self.record.id()
    }

    pub fn reading(&self, now: DateTime<Local>) -> TimerReading {
        self.record.reading(now)
    }

    /// Record the stage at `now`. Returns it if it differs from the last one seen.
    pub fn observe_stage(&mut self, now: DateTime<Local>) -> Option<FastingStage> {
        let stage = self.record.stage(now);
        if stage == self.last_stage {
            return None;
        }
        self.last_stage = stage;
        Some(stage)
    }

    /// Whether the target has been reached
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        self.record.hit_target(now)
    }

    /// Close the record at `now`
    pub fn close(mut self, now: DateTime<Local>, completed: bool) -> EndResult {
        self.record.finish(now, completed);
        EndResult::from_record(self.record, now)
    }
}

/// Result of closing a fast
#[derive(Debug, Clone)]
pub struct EndResult {
    pub fast_id: FastId,
    pub plan_label: String,
    pub duration: Duration,
    pub completed: bool,
    pub record: FastRecord,
}

impl EndResult {
    fn from_record(record: FastRecord, now: DateTime<Local>) -> Self {
        Self {
            fast_id: record.id(),
            plan_label: record.plan_label().to_string(),
            duration: record.duration(now).to_std().unwrap_or(Duration::ZERO),
            completed: record.completed(),
            record,
        }
    }
}
