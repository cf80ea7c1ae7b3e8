//! Peer Activity Sync
//!
//! Guards sharing one profile (several windows or tabs) would otherwise run
//! independent idle timers over the same stored record. A `PeerChannel`
//! broadcasts every local activity refresh so all members re-arm together.

use tokio::sync::broadcast;
use uuid::Uuid;

/// Activity refresh published by one guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivitySignal {
    /// Publishing guard
    pub origin: Uuid,
    /// Refresh time (Unix timestamp ms)
    pub at_ms: i64,
}

/// Shared channel between guards of one profile
#[derive(Debug, Clone)]
pub struct PeerChannel {
    tx: broadcast::Sender<ActivitySignal>,
}

impl PeerChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn join(&self) -> PeerLink {
        PeerLink {
            origin: Uuid::new_v4(),
            tx: self.tx.clone(),
        }
    }
}

impl Default for PeerChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

/// One guard's membership in a `PeerChannel`
#[derive(Debug, Clone)]
pub(crate) struct PeerLink {
    origin: Uuid,
    tx: broadcast::Sender<ActivitySignal>,
}

impl PeerLink {
    pub(crate) fn publish(&self, at_ms: i64) {
        // No receivers is fine: this guard is alone on the profile
        let _ = self.tx.send(ActivitySignal {
            origin: self.origin,
            at_ms,
        });
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ActivitySignal> {
        self.tx.subscribe()
    }

    pub(crate) fn is_own(&self, signal: &ActivitySignal) -> bool {
        signal.origin == self.origin
    }
}
