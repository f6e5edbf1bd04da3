//! Cross-device sync relay
//!
//! Every local state change is written to the shared store and pushed to
//! the peer. Inbound snapshots are ordered last-write-wins on
//! `(last_sync_timestamp, device priority)`; an accepted snapshot replaces
//! the local mirror wholesale.

use honestfast_api::{DeviceRole, SharedSnapshot, SyncPayload};
use honestfast_host_api::{PeerEvent, PeerLink, SharedStore};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Ordering key of a snapshot: when it was written and by whom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncStamp {
    pub timestamp: f64,
    pub origin: DeviceRole,
}

impl SyncStamp {
    pub fn new(timestamp: f64, origin: DeviceRole) -> Self {
        Self { timestamp, origin }
    }

    /// Total order: timestamp first, then device priority
    pub fn compare(&self, other: &SyncStamp) -> Ordering {
        self.timestamp
            .total_cmp(&other.timestamp)
            .then(self.origin.priority().cmp(&other.origin.priority()))
    }

    /// An incoming snapshot is stale only when it orders strictly below the mirror
    pub fn is_stale_against(&self, mirror: &SyncStamp) -> bool {
        self.compare(mirror) == Ordering::Less
    }
}

/// Relay between the engine, the shared store and the peer link
pub struct SyncRelay {
    role: DeviceRole,
    shared: Arc<dyn SharedStore>,
    peer: Arc<dyn PeerLink>,
    mirror: Option<SyncStamp>,
}

impl SyncRelay {
    pub fn new(role: DeviceRole, shared: Arc<dyn SharedStore>, peer: Arc<dyn PeerLink>) -> Self {
        Self {
            role,
            shared,
            peer,
            mirror: None,
        }
    }

    pub fn role(&self) -> DeviceRole {
        self.role
    }

    /// Inbound peer events. `None` if already taken.
    pub fn subscribe(&self) -> Option<mpsc::Receiver<PeerEvent>> {
        self.peer.subscribe()
    }

    /// Current content of the shared store, default on read failure
    pub fn read_shared(&self) -> SharedSnapshot {
        match self.shared.read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to read shared state");
                SharedSnapshot::default()
            }
        }
    }

    /// Publish a local change. Failures are logged and swallowed.
    pub fn publish(&mut self, snapshot: &SharedSnapshot) {
        if let Err(e) = self.shared.write(snapshot) {
            warn!(error = %e, "Failed to write shared state");
        }
        self.mirror = Some(SyncStamp::new(snapshot.last_sync_timestamp, self.role));

        let payload = snapshot.to_payload();
        if let Err(e) = self.peer.update_context(payload.clone()) {
            warn!(error = %e, "Failed to update peer context");
        }

        if self.peer.is_reachable() {
            if let Err(e) = self.peer.send_message(payload) {
                warn!(error = %e, "Failed to send snapshot to peer");
            }
        } else {
            debug!("Peer not reachable, context will be delivered later");
        }

        debug!(
            role = %self.role,
            is_fasting = snapshot.is_fasting,
            timestamp = snapshot.last_sync_timestamp,
            "Snapshot published"
        );
    }

    /// Decide whether an inbound payload from `from` replaces the mirror.
    ///
    /// Returns the decoded snapshot when accepted; stale snapshots are
    /// dropped and yield `None`.
    pub fn accept(&mut self, payload: &SyncPayload, from: DeviceRole) -> Option<SharedSnapshot> {
        let incoming = SharedSnapshot::from_payload(payload);
        let stamp = SyncStamp::new(incoming.last_sync_timestamp, from);
        let mirror = self.mirror_stamp();

        if stamp.is_stale_against(&mirror) {
            debug!(
                from = %from,
                incoming = incoming.last_sync_timestamp,
                mirror = mirror.timestamp,
                "Dropping stale snapshot"
            );
            return None;
        }

        if let Err(e) = self.shared.write(&incoming) {
            warn!(error = %e, "Failed to mirror remote snapshot");
        }
        self.mirror = Some(stamp);

        debug!(
            from = %from,
            is_fasting = incoming.is_fasting,
            timestamp = incoming.last_sync_timestamp,
            "Remote snapshot accepted"
        );
        Some(incoming)
    }

    /// Stamp of the current mirror, loaded from the shared store the first time
    fn mirror_stamp(&mut self) -> SyncStamp {
        if let Some(stamp) = self.mirror {
            return stamp;
        }
        let stored = self.read_shared();
        let stamp = SyncStamp::new(stored.last_sync_timestamp, self.role);
        self.mirror = Some(stamp);
        stamp
    }
}
