use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of a transport's traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    pub sent_sync: u64,
    pub sent_async: u64,
    pub replies_sent: u64,
    pub replies_received: u64,
    pub requests_received: u64,
    pub malformed_dropped: u64,
    pub unexpected_replies: u64,
    pub heartbeats_sent: u64,
    pub heartbeats_failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) sent_sync: AtomicU64,
    pub(crate) sent_async: AtomicU64,
    pub(crate) replies_sent: AtomicU64,
    pub(crate) replies_received: AtomicU64,
    pub(crate) requests_received: AtomicU64,
    pub(crate) malformed_dropped: AtomicU64,
    pub(crate) unexpected_replies: AtomicU64,
    pub(crate) heartbeats_sent: AtomicU64,
    pub(crate) heartbeats_failed: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TransportStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        TransportStats {
            sent_sync: get(&self.sent_sync),
            sent_async: get(&self.sent_async),
            replies_sent: get(&self.replies_sent),
            replies_received: get(&self.replies_received),
            requests_received: get(&self.requests_received),
            malformed_dropped: get(&self.malformed_dropped),
            unexpected_replies: get(&self.unexpected_replies),
            heartbeats_sent: get(&self.heartbeats_sent),
            heartbeats_failed: get(&self.heartbeats_failed),
        }
    }
}
