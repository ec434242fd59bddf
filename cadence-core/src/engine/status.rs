//! Current track status plus a broadcast of every change.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::ipc::events::{TrackStatus, TrackStatusEvent};

/// Broadcast capacity: status changes are rare compared to frames, 64 covers
/// any burst a slow subscriber is likely to miss.
const STATUS_BROADCAST_CAP: usize = 64;

pub struct StatusBoard {
    current: Mutex<TrackStatus>,
    tx: broadcast::Sender<TrackStatusEvent>,
    seq: AtomicU64,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STATUS_BROADCAST_CAP);
        Self {
            current: Mutex::new(TrackStatus::Idle),
            tx,
            seq: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> TrackStatus {
        *self.current.lock()
    }

    /// Move to `status` and publish it. `Closed` is terminal; repeated
    /// statuses are not re-published. Returns whether anything changed.
    pub fn set(&self, status: TrackStatus, detail: Option<String>) -> bool {
        let mut current = self.current.lock();
        if *current == status || *current == TrackStatus::Closed {
            return false;
        }
        *current = status;
        self.publish(status, detail);
        true
    }

    /// Move to `to` only when the current status is one of `from`. Never
    /// leaves `Closed`.
    pub fn transition(&self, from: &[TrackStatus], to: TrackStatus) -> bool {
        let mut current = self.current.lock();
        if *current == to || *current == TrackStatus::Closed || !from.contains(&*current) {
            return false;
        }
        *current = to;
        self.publish(to, None);
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackStatusEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, status: TrackStatus, detail: Option<String>) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        debug!(seq, ?status, "track status changed");
        // No subscribers is fine.
        let _ = self.tx.send(TrackStatusEvent {
            seq,
            status,
            detail,
        });
    }
}
