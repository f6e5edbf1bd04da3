//! Fasting engine

use chrono::{DateTime, Local};
use honestfast_api::{
    FastRecord, FastState, FastingPlan, Preferences, SharedSnapshot, SyncPayload, TimerReading,
    is_valid_target,
};
use honestfast_config::DEFAULT_MILESTONE_HOURS;
use honestfast_host_api::NotificationScheduler;
use honestfast_store::FastStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    ActiveFast, CoreEvent, EndResult, FastStats, SyncRelay, plan_reminders_with, reminder_ids,
};

/// Why a start request was refused
#[derive(Debug, Clone, PartialEq)]
pub enum DenyReason {
    /// A fast is already running
    AlreadyFasting,
    /// Target hours must be positive and at most `MAX_TARGET_HOURS`
    InvalidTarget(f64),
}

/// Start decision from the engine
#[derive(Debug)]
pub enum StartDecision {
    Started(FastRecord),
    Denied { reason: DenyReason },
}

/// End decision from the engine
#[derive(Debug)]
pub enum EndDecision {
    Ended(EndResult),
    NoActiveFast,
    /// Completion requested before the target was reached
    NotReached { remaining: Duration },
}

/// Immutable view of the engine for renderers
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub state: FastState,
    /// The running fast, or the completed one awaiting dismissal
    pub fast: Option<FastRecord>,
    pub reading: Option<TimerReading>,
    pub preferences: Preferences,
}

/// The fasting engine
///
/// Owns the single active fast and drives it through
/// `Idle -> Active -> Complete -> Idle`. Every collaborator is injected;
/// collaborator failures are logged and never surface as errors.
pub struct FastingEngine {
    store: Arc<dyn FastStore>,
    notifier: Arc<dyn NotificationScheduler>,
    relay: SyncRelay,
    milestone_hours: Vec<u32>,
    preferences: Preferences,
    current: Option<ActiveFast>,
    completed: Option<FastRecord>,
    subscribers: Vec<mpsc::UnboundedSender<CoreEvent>>,
}

impl FastingEngine {
    /// Create a new engine. Call [`FastingEngine::restore`] before use.
    pub fn new(
        store: Arc<dyn FastStore>,
        notifier: Arc<dyn NotificationScheduler>,
        relay: SyncRelay,
    ) -> Self {
        info!(role = %relay.role(), "Fasting engine initialized");

        Self {
            store,
            notifier,
            relay,
            milestone_hours: DEFAULT_MILESTONE_HOURS.to_vec(),
            preferences: Preferences::default(),
            current: None,
            completed: None,
            subscribers: Vec::new(),
        }
    }

    /// Use a custom set of milestone reminder hours
    pub fn with_milestone_hours(mut self, hours: Vec<u32>) -> Self {
        self.milestone_hours = hours;
        self
    }

    /// Load preferences and the active fast, then republish the snapshot
    pub fn restore(&mut self, now: DateTime<Local>) {
        self.load(now);
        self.publish_current(now);
    }

    /// Load preferences and the active fast without touching the shared state
    pub fn load(&mut self, now: DateTime<Local>) {
        self.preferences = match self.store.load_preferences() {
            Ok(Some(prefs)) => prefs,
            Ok(None) => {
                let prefs = Preferences::default();
                if let Err(e) = self.store.save_preferences(&prefs) {
                    warn!(error = %e, "Failed to save default preferences");
                }
                prefs
            }
            Err(e) => {
                warn!(error = %e, "Failed to load preferences, using defaults");
                Preferences::default()
            }
        };

        let active = match self.store.active_fast() {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "Failed to load active fast");
                None
            }
        };

        self.completed = None;
        self.current = active.map(|record| {
            info!(
                fast_id = %record.id(),
                plan = record.plan_label(),
                start = %record.start_time(),
                "Restored active fast"
            );
            ActiveFast::new(record, now)
        });
        if self.current.is_none() {
            debug!("No active fast to restore");
        }
    }

    /// Publish the current state to the shared store and the peer.
    ///
    /// When the shared store already describes this state, its timestamp is
    /// kept: republishing unchanged state must not outrank a peer change
    /// made while this side was away.
    pub fn publish_current(&mut self, now: DateTime<Local>) {
        let mut snapshot = match &self.current {
            Some(active) => SharedSnapshot::fasting(&active.record, now),
            None => SharedSnapshot::not_fasting(now),
        };

        let stored = self.relay.read_shared();
        if stored.same_state(&snapshot) {
            debug!(
                last_sync = stored.last_sync_timestamp,
                "Shared state unchanged, keeping its timestamp"
            );
            snapshot.last_sync_timestamp = stored.last_sync_timestamp;
        }
        self.relay.publish(&snapshot);
    }

    /// Register an observer. Every event the engine produces is sent to it.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CoreEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn state(&self) -> FastState {
        if self.current.is_some() {
            FastState::Active
        } else if self.completed.is_some() {
            FastState::Complete
        } else {
            FastState::Idle
        }
    }

    /// The running fast, if any
    pub fn active_fast(&self) -> Option<&FastRecord> {
        self.current.as_ref().map(|a| &a.record)
    }

    pub fn relay(&self) -> &SyncRelay {
        &self.relay
    }

    /// Start a fast with the given label and target
    pub fn start_fast(
        &mut self,
        plan_label: &str,
        target_hours: f64,
        now: DateTime<Local>,
    ) -> StartDecision {
        if self.current.is_some() {
            debug!(plan = plan_label, "Start denied: already fasting");
            return StartDecision::Denied {
                reason: DenyReason::AlreadyFasting,
            };
        }

        if !is_valid_target(target_hours) {
            debug!(plan = plan_label, target_hours, "Start denied: invalid target");
            return StartDecision::Denied {
                reason: DenyReason::InvalidTarget(target_hours),
            };
        }

        // Starting over a completed fast acknowledges it
        if let Some(event) = self.dismiss() {
            debug!(?event, "Completed fast dismissed by new start");
        }

        let record = FastRecord::new(now, target_hours, plan_label);
        if let Err(e) = self.store.insert_fast(&record) {
            warn!(error = %e, fast_id = %record.id(), "Failed to persist new fast");
        }

        self.schedule_reminders(&record, now);
        self.relay.publish(&SharedSnapshot::fasting(&record, now));

        info!(
            fast_id = %record.id(),
            plan = plan_label,
            target_hours,
            target_end = ?record.target_end(),
            "Fast started"
        );

        self.emit(CoreEvent::FastStarted {
            fast_id: record.id(),
            plan_label: record.plan_label().to_string(),
            start_time: record.start_time(),
            target_end: record.target_end(),
        });

        self.current = Some(ActiveFast::new(record.clone(), now));
        StartDecision::Started(record)
    }

    /// Start a fast from a plan
    pub fn start_plan(&mut self, plan: &FastingPlan, now: DateTime<Local>) -> StartDecision {
        self.start_fast(&plan.label(), plan.fast_hours, now)
    }

    /// Advance the timer
    ///
    /// Reports newly entered stages. When the target is reached the fast is
    /// completed through the same path as [`FastingEngine::complete_fast`].
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        let active = match &mut self.current {
            Some(a) => a,
            None => return events,
        };

        if let Some(stage) = active.observe_stage(now) {
            let reading = active.reading(now);
            info!(
                fast_id = %active.id(),
                stage = %stage,
                elapsed_hours = reading.elapsed_hours(),
                "Stage changed"
            );
            let event = CoreEvent::StageChanged {
                fast_id: active.id(),
                stage,
                elapsed: reading.elapsed,
            };
            self.emit(event.clone());
            events.push(event);
        }

        if self.current.as_ref().is_some_and(|a| a.is_due(now)) {
            if let Some((_, event)) = self.close_completed(now) {
                events.push(event);
            }
        }

        events
    }

    /// End the running fast now, whether or not the target was reached
    pub fn end_fast(&mut self, now: DateTime<Local>) -> EndDecision {
        let Some(active) = self.current.take() else {
            debug!("End requested with no active fast");
            return EndDecision::NoActiveFast;
        };

        let completed = active.is_due(now);
        let result = active.close(now, completed);
        self.persist_end(&result);
        self.cancel_reminders();
        self.relay.publish(&SharedSnapshot::not_fasting(now));

        info!(
            fast_id = %result.fast_id,
            duration_secs = result.duration.as_secs(),
            completed = result.completed,
            "Fast ended"
        );

        self.emit(CoreEvent::FastEnded {
            fast_id: result.fast_id,
            duration: result.duration,
            completed: result.completed,
        });

        EndDecision::Ended(result)
    }

    /// Close the running fast as completed. Only valid once the target is reached.
    pub fn complete_fast(&mut self, now: DateTime<Local>) -> EndDecision {
        let Some(active) = &self.current else {
            debug!("Complete requested with no active fast");
            return EndDecision::NoActiveFast;
        };

        if !active.is_due(now) {
            let remaining = active
                .record
                .time_remaining(now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            debug!(
                fast_id = %active.id(),
                remaining_secs = remaining.as_secs(),
                "Complete requested before target"
            );
            return EndDecision::NotReached { remaining };
        }

        match self.close_completed(now) {
            Some((result, _)) => EndDecision::Ended(result),
            None => EndDecision::NoActiveFast,
        }
    }

    /// Acknowledge a completed fast, returning to idle
    pub fn dismiss(&mut self) -> Option<CoreEvent> {
        let record = self.completed.take()?;
        info!(fast_id = %record.id(), "Completed fast dismissed");

        let event = CoreEvent::Dismissed {
            fast_id: record.id(),
        };
        self.emit(event.clone());
        Some(event)
    }

    /// Reconcile with a snapshot received from the peer
    ///
    /// Stale snapshots are dropped. A remote start creates a local copy of
    /// the fast when none is running; a remote stop ends the local fast.
    /// Neither republishes.
    pub fn apply_remote(&mut self, payload: &SyncPayload, now: DateTime<Local>) -> Vec<CoreEvent> {
        let origin = self.relay.role().peer();
        let Some(snapshot) = self.relay.accept(payload, origin) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        match (snapshot.is_fasting, self.current.is_some()) {
            (true, false) => {
                let Some(start_time) = snapshot.start_time_local() else {
                    warn!(from = %origin, "Remote fast has no start time, ignoring");
                    return events;
                };
                if let Some(event) = self.dismiss() {
                    events.push(event);
                }

                let record = FastRecord::new(
                    start_time,
                    snapshot.effective_target_hours(),
                    snapshot.plan_label.as_str(),
                );
                if let Err(e) = self.store.insert_fast(&record) {
                    warn!(error = %e, fast_id = %record.id(), "Failed to persist remote fast");
                }
                self.schedule_reminders(&record, now);

                info!(
                    fast_id = %record.id(),
                    from = %origin,
                    plan = record.plan_label(),
                    start = %start_time,
                    "Remote fast started"
                );

                let event = CoreEvent::RemoteStarted {
                    fast_id: record.id(),
                    origin,
                    start_time,
                };
                self.current = Some(ActiveFast::new(record, now));
                self.emit(event.clone());
                events.push(event);
            }
            (false, true) => {
                let Some(active) = self.current.take() else {
                    return events;
                };
                let completed = active.is_due(now);
                let result = active.close(now, completed);
                self.persist_end(&result);
                self.cancel_reminders();

                info!(
                    fast_id = %result.fast_id,
                    from = %origin,
                    duration_secs = result.duration.as_secs(),
                    completed = result.completed,
                    "Remote fast ended"
                );

                let event = CoreEvent::RemoteEnded {
                    fast_id: result.fast_id,
                    origin,
                    duration: result.duration,
                    completed: result.completed,
                };
                self.emit(event.clone());
                events.push(event);
            }
            _ => {
                debug!(
                    from = %origin,
                    is_fasting = snapshot.is_fasting,
                    "Remote snapshot already consistent"
                );
            }
        }

        events
    }

    /// Immutable view for renderers
    pub fn snapshot(&self, now: DateTime<Local>) -> EngineSnapshot {
        let (fast, reading) = match (&self.current, &self.completed) {
            (Some(active), _) => (Some(active.record.clone()), Some(active.reading(now))),
            (None, Some(done)) => (Some(done.clone()), Some(done.reading(now))),
            (None, None) => (None, None),
        };

        EngineSnapshot {
            state: self.state(),
            fast,
            reading,
            preferences: self.preferences.clone(),
        }
    }

    /// All records, newest first. Store failures yield an empty list.
    pub fn history(&self) -> Vec<FastRecord> {
        match self.store.all_fasts() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to load history");
                Vec::new()
            }
        }
    }

    /// Statistics over the stored history
    pub fn stats(&self, now: DateTime<Local>) -> FastStats {
        FastStats::compute(&self.history(), self.active_fast(), now)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, prefs: Preferences) {
        if let Err(e) = self.store.save_preferences(&prefs) {
            warn!(error = %e, "Failed to save preferences");
        }
        debug!(
            notifications = prefs.notifications_enabled,
            milestones = prefs.milestone_notifications,
            "Preferences updated"
        );
        self.preferences = prefs;
    }

    /// Delete every record and the preferences, and drop the running fast
    pub fn wipe_all_data(&mut self, now: DateTime<Local>) -> CoreEvent {
        let records_deleted = self.history().len();

        if let Err(e) = self.store.delete_all_fasts() {
            warn!(error = %e, "Failed to delete fasts");
        }
        if let Err(e) = self.store.delete_preferences() {
            warn!(error = %e, "Failed to delete preferences");
        }
        self.cancel_reminders();

        self.current = None;
        self.completed = None;
        self.preferences = Preferences::default();
        self.relay.publish(&SharedSnapshot::not_fasting(now));

        info!(records_deleted, "All data wiped");

        let event = CoreEvent::DataWiped { records_deleted };
        self.emit(event.clone());
        event
    }

    /// Shared by `complete_fast` and `tick`: `Active -> Complete`
    fn close_completed(&mut self, now: DateTime<Local>) -> Option<(EndResult, CoreEvent)> {
        let active = self.current.take()?;
        let result = active.close(now, true);
        self.persist_end(&result);
        self.relay.publish(&SharedSnapshot::not_fasting(now));

        info!(
            fast_id = %result.fast_id,
            duration_secs = result.duration.as_secs(),
            "Fast completed"
        );

        self.completed = Some(result.record.clone());
        let event = CoreEvent::FastCompleted {
            fast_id: result.fast_id,
            duration: result.duration,
        };
        self.emit(event.clone());
        Some((result, event))
    }

    fn persist_end(&self, result: &EndResult) {
        if let Err(e) = self.store.update_fast(&result.record) {
            warn!(error = %e, fast_id = %result.fast_id, "Failed to persist fast end");
        }
    }

    fn schedule_reminders(&self, record: &FastRecord, now: DateTime<Local>) {
        self.cancel_reminders();

        for reminder in plan_reminders_with(record, &self.preferences, &self.milestone_hours, now) {
            if let Err(e) = self.notifier.schedule_at(
                &reminder.id,
                reminder.fire_time,
                &reminder.title,
                &reminder.body,
            ) {
                warn!(error = %e, id = %reminder.id, "Failed to schedule reminder");
            } else {
                debug!(id = %reminder.id, fire_time = %reminder.fire_time, "Reminder scheduled");
            }
        }
    }

    fn cancel_reminders(&self) {
        let ids = reminder_ids(&self.milestone_hours);
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        if let Err(e) = self.notifier.cancel(&refs) {
            warn!(error = %e, "Failed to cancel reminders");
        }
    }

    fn emit(&mut self, event: CoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
