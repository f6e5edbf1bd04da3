//! Core events emitted by the engine

use chrono::{DateTime, Local};
use honestfast_api::{DeviceRole, FastingStage};
use honestfast_util::FastId;
use std::time::Duration;

/// Events emitted by the fasting engine
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A local fast started
    FastStarted {
        fast_id: FastId,
        plan_label: String,
        start_time: DateTime<Local>,
        target_end: Option<DateTime<Local>>,
    },

    /// The running fast entered a new stage
    StageChanged {
        fast_id: FastId,
        stage: FastingStage,
        elapsed: Duration,
    },

    /// The running fast reached its target and was closed
    FastCompleted {
        fast_id: FastId,
        duration: Duration,
    },

    /// The running fast was ended by the user
    FastEnded {
        fast_id: FastId,
        duration: Duration,
        completed: bool,
    },

    /// A completed fast was acknowledged
    Dismissed { fast_id: FastId },

    /// The peer started a fast and a local copy was created
    RemoteStarted {
        fast_id: FastId,
        origin: DeviceRole,
        start_time: DateTime<Local>,
    },

    /// The peer ended the fast and the local copy was closed
    RemoteEnded {
        fast_id: FastId,
        origin: DeviceRole,
        duration: Duration,
        completed: bool,
    },

    /// All records and preferences were deleted
    DataWiped { records_deleted: usize },
}
