//! In-memory collaborators for testing

use chrono::{DateTime, Local};
use honestfast_api::SharedSnapshot;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{HostError, HostResult, NotificationScheduler, SharedStore};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A notification the mock scheduler is holding
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNotification {
    pub id: String,
    pub fire_time: DateTime<Local>,
    pub title: String,
    pub body: String,
}

/// Mock notification scheduler for unit/integration testing
#[derive(Default)]
pub struct MockNotifier {
    pending: Mutex<BTreeMap<String, ScheduledNotification>>,
    cancelled: Mutex<Vec<String>>,

    /// Simulate the user declining notification permission
    pub deny_permission: Arc<Mutex<bool>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications currently scheduled, ordered by id
    pub fn pending(&self) -> Vec<ScheduledNotification> {
        lock(&self.pending).values().cloned().collect()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        lock(&self.pending).keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<ScheduledNotification> {
        lock(&self.pending).get(id).cloned()
    }

    /// Every id ever passed to `cancel`, in call order
    pub fn cancelled(&self) -> Vec<String> {
        lock(&self.cancelled).clone()
    }

    pub fn set_deny_permission(&self, deny: bool) {
        *lock(&self.deny_permission) = deny;
    }
}

impl NotificationScheduler for MockNotifier {
    fn schedule_at(
        &self,
        id: &str,
        fire_time: DateTime<Local>,
        title: &str,
        body: &str,
    ) -> HostResult<()> {
        if *lock(&self.deny_permission) {
            return Err(HostError::PermissionDenied("notifications not authorized".into()));
        }

        lock(&self.pending).insert(
            id.to_string(),
            ScheduledNotification {
                id: id.to_string(),
                fire_time,
                title: title.to_string(),
                body: body.to_string(),
            },
        );
        Ok(())
    }

    fn cancel(&self, ids: &[&str]) -> HostResult<()> {
        let mut pending = lock(&self.pending);
        let mut cancelled = lock(&self.cancelled);
        for id in ids {
            pending.remove(*id);
            cancelled.push(id.to_string());
        }
        Ok(())
    }
}

/// In-memory shared store
#[derive(Default)]
pub struct MemorySharedStore {
    current: Mutex<Option<SharedSnapshot>>,
    write_count: Mutex<usize>,

    /// Configure writes to fail
    pub fail_writes: Arc<Mutex<bool>>,
}

impl MemorySharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        *lock(&self.write_count)
    }

    /// Last written snapshot, if any
    pub fn last_written(&self) -> Option<SharedSnapshot> {
        lock(&self.current).clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *lock(&self.fail_writes) = fail;
    }
}

impl SharedStore for MemorySharedStore {
    fn write(&self, snapshot: &SharedSnapshot) -> HostResult<()> {
        if *lock(&self.fail_writes) {
            return Err(HostError::Internal("Mock shared store write failure".into()));
        }
        *lock(&self.current) = Some(snapshot.clone());
        *lock(&self.write_count) += 1;
        Ok(())
    }

    fn read(&self) -> HostResult<SharedSnapshot> {
        Ok(lock(&self.current).clone().unwrap_or_default())
    }
}
