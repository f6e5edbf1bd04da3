//! Collaborator traits

use chrono::{DateTime, Local};
use honestfast_api::{SharedSnapshot, SyncPayload};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from collaborator operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Peer not reachable")]
    Unreachable,

    #[error("Peer channel full, message dropped")]
    ChannelFull,

    #[error("Peer disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Local notification scheduler
///
/// The engine computes fire times and delegates delivery. Every call is
/// best-effort: callers log failures and move on.
pub trait NotificationScheduler: Send + Sync {
    /// Schedule (or replace) the notification with this id
    fn schedule_at(
        &self,
        id: &str,
        fire_time: DateTime<Local>,
        title: &str,
        body: &str,
    ) -> HostResult<()>;

    /// Cancel pending notifications by id. Unknown ids are ignored.
    fn cancel(&self, ids: &[&str]) -> HostResult<()>;
}

/// Device-local, cross-process key-value blob holding the latest snapshot
///
/// Read by glanceable surfaces; always written as a whole record.
pub trait SharedStore: Send + Sync {
    fn write(&self, snapshot: &SharedSnapshot) -> HostResult<()>;

    /// Read the current snapshot. An empty store reads as the default
    /// (not fasting) snapshot.
    fn read(&self) -> HostResult<SharedSnapshot>;
}

/// What arrived from the peer device
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// Fire-and-forget message, delivered only while both sides were reachable
    Message(SyncPayload),

    /// Durable latest context, delivered on activation
    Context(SyncPayload),
}

impl PeerEvent {
    pub fn payload(&self) -> &SyncPayload {
        match self {
            PeerEvent::Message(p) | PeerEvent::Context(p) => p,
        }
    }

    pub fn into_payload(self) -> SyncPayload {
        match self {
            PeerEvent::Message(p) | PeerEvent::Context(p) => p,
        }
    }
}

/// Best-effort bidirectional link to the peer device
pub trait PeerLink: Send + Sync {
    /// Whether the peer is currently active and can take an immediate message
    fn is_reachable(&self) -> bool;

    /// One-shot message; fails fast when the peer is unreachable or busy
    fn send_message(&self, payload: SyncPayload) -> HostResult<()>;

    /// Replace the durable context. Supersedes any earlier context the
    /// peer has not received yet.
    fn update_context(&self, payload: SyncPayload) -> HostResult<()>;

    /// Take the receiving end for inbound events. Returns `None` after
    /// the first call.
    fn subscribe(&self) -> Option<mpsc::Receiver<PeerEvent>>;
}
