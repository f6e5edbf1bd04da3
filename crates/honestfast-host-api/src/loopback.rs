//! In-process peer links
//!
//! [`LoopbackPeer::pair`] returns two connected ends that behave like a
//! companion-device link: messages only go through while the other side
//! is active, and the latest context waits for the other side's next
//! activation.

use honestfast_api::SyncPayload;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::{HostError, HostResult, PeerEvent, PeerLink};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One side of the link, as seen by both ends
struct Endpoint {
    inbox_tx: mpsc::Sender<PeerEvent>,
    active: AtomicBool,
    pending_context: Mutex<Option<SyncPayload>>,
}

impl Endpoint {
    fn new(inbox_tx: mpsc::Sender<PeerEvent>) -> Self {
        Self {
            inbox_tx,
            active: AtomicBool::new(true),
            pending_context: Mutex::new(None),
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Deliver the pending context, if any. A context that cannot be
    /// queued stays pending unless a newer one replaced it meanwhile.
    fn flush_context(&self) {
        let Some(payload) = lock(&self.pending_context).take() else {
            return;
        };

        match self.inbox_tx.try_send(PeerEvent::Context(payload)) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let mut slot = lock(&self.pending_context);
                if slot.is_none() {
                    *slot = Some(event.into_payload());
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Peer inbox closed, dropping context");
            }
        }
    }
}

/// One end of an in-process peer link
pub struct LoopbackPeer {
    local: Arc<Endpoint>,
    remote: Arc<Endpoint>,
    inbox_rx: Mutex<Option<mpsc::Receiver<PeerEvent>>>,
}

impl LoopbackPeer {
    /// Create two connected ends, both active. `capacity` bounds each inbox.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel(capacity.max(1));
        let (b_tx, b_rx) = mpsc::channel(capacity.max(1));

        let a = Arc::new(Endpoint::new(a_tx));
        let b = Arc::new(Endpoint::new(b_tx));

        let left = Self {
            local: a.clone(),
            remote: b.clone(),
            inbox_rx: Mutex::new(Some(a_rx)),
        };
        let right = Self {
            local: b,
            remote: a,
            inbox_rx: Mutex::new(Some(b_rx)),
        };
        (left, right)
    }

    /// Mark this end as active (foreground) or inactive. Becoming active
    /// delivers the latest context the other end left for us.
    pub fn set_active(&self, active: bool) {
        let was_active = self.local.active.swap(active, Ordering::SeqCst);
        if active && !was_active {
            self.local.flush_context();
        }
    }

    pub fn is_active(&self) -> bool {
        self.local.is_active()
    }
}

impl PeerLink for LoopbackPeer {
    fn is_reachable(&self) -> bool {
        self.remote.is_active()
    }

    fn send_message(&self, payload: SyncPayload) -> HostResult<()> {
        if !self.remote.is_active() {
            return Err(HostError::Unreachable);
        }
        self.remote
            .inbox_tx
            .try_send(PeerEvent::Message(payload))
            .map_err(|e| match e {
                TrySendError::Full(_) => HostError::ChannelFull,
                TrySendError::Closed(_) => HostError::Disconnected,
            })
    }

    fn update_context(&self, payload: SyncPayload) -> HostResult<()> {
        *lock(&self.remote.pending_context) = Some(payload);
        if self.remote.is_active() {
            self.remote.flush_context();
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::Receiver<PeerEvent>> {
        lock(&self.inbox_rx).take()
    }
}

/// A link whose peer is never there
///
/// Used on a device running without a companion. Contexts are accepted
/// and discarded; messages fail with [`HostError::Unreachable`].
pub struct DisconnectedPeer {
    // Kept so the receiver handed out by `subscribe` never reports closed
    _tx: mpsc::Sender<PeerEvent>,
    rx: Mutex<Option<mpsc::Receiver<PeerEvent>>>,
}

impl DisconnectedPeer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            _tx: tx,
            rx: Mutex::new(Some(rx)),
        }
    }
}

impl Default for DisconnectedPeer {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerLink for DisconnectedPeer {
    fn is_reachable(&self) -> bool {
        false
    }

    fn send_message(&self, _payload: SyncPayload) -> HostResult<()> {
        Err(HostError::Unreachable)
    }

    fn update_context(&self, _payload: SyncPayload) -> HostResult<()> {
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::Receiver<PeerEvent>> {
        lock(&self.rx).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(fasting: bool) -> SyncPayload {
        let mut p = SyncPayload::new();
        p.insert("isFasting", fasting);
        p
    }

    #[tokio::test]
    async fn test_message_delivered_when_reachable() {
        let (phone, watch) = LoopbackPeer::pair(8);
        let mut watch_rx = watch.subscribe().unwrap();

        assert!(phone.is_reachable());
        phone.send_message(payload(true)).unwrap();

        let event = watch_rx.recv().await.unwrap();
        assert_eq!(event, PeerEvent::Message(payload(true)));
    }

    #[tokio::test]
    async fn test_message_rejected_when_peer_inactive() {
        let (phone, watch) = LoopbackPeer::pair(8);
        watch.set_active(false);

        assert!(!phone.is_reachable());
        assert!(matches!(
            phone.send_message(payload(true)),
            Err(HostError::Unreachable)
        ));
    }

    #[tokio::test]
    async fn test_context_latest_wins_on_activation() {
        let (phone, watch) = LoopbackPeer::pair(8);
        let mut watch_rx = watch.subscribe().unwrap();
        watch.set_active(false);

        phone.update_context(payload(true)).unwrap();
        phone.update_context(payload(false)).unwrap();
        assert!(watch_rx.try_recv().is_err());

        watch.set_active(true);
        let event = watch_rx.recv().await.unwrap();
        assert_eq!(event, PeerEvent::Context(payload(false)));
        assert!(watch_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_inbox_reports_channel_full() {
        let (phone, watch) = LoopbackPeer::pair(1);
        let _watch_rx = watch.subscribe().unwrap();

        phone.send_message(payload(true)).unwrap();
        assert!(matches!(
            phone.send_message(payload(false)),
            Err(HostError::ChannelFull)
        ));
    }

    #[test]
    fn test_subscribe_only_once() {
        let (phone, _watch) = LoopbackPeer::pair(4);
        assert!(phone.subscribe().is_some());
        assert!(phone.subscribe().is_none());
    }

    #[test]
    fn test_disconnected_peer() {
        let peer = DisconnectedPeer::new();
        assert!(!peer.is_reachable());
        assert!(peer.update_context(payload(true)).is_ok());
        assert!(matches!(
            peer.send_message(payload(true)),
            Err(HostError::Unreachable)
        ));

        let mut rx = peer.subscribe().unwrap();
        assert!(rx.try_recv().is_err());
    }
}
