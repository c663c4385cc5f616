use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ipcloop_envelope::Reply;

struct Waiter {
    reply_type: i32,
    slot: SyncSender<Reply>,
}

/// Outcome of offering an inbound reply to the waiter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    Delivered,
    /// No caller is waiting on this correlation id.
    Unknown,
    /// A caller is waiting on this id, but for a different reply type.
    TypeMismatch,
}

/// Table of sync callers waiting for replies, keyed by correlation id.
pub(crate) struct PendingReplies {
    next_id: AtomicU32,
    waiters: Mutex<HashMap<u32, Waiter>>,
}

impl PendingReplies {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Register a waiter for a reply of `reply_type`.
    ///
    /// The waiter is removed when the returned ticket is dropped.
    pub(crate) fn register(&self, reply_type: i32) -> Ticket<'_> {
        let (slot, rx) = mpsc::sync_channel(1);
        let mut waiters = self.lock();
        let id = loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 && !waiters.contains_key(&id) {
                break id;
            }
        };
        waiters.insert(id, Waiter { reply_type, slot });
        Ticket {
            pending: self,
            id,
            rx,
        }
    }

    pub(crate) fn complete(&self, reply: Reply) -> Completion {
        let mut waiters = self.lock();
        let expected = match waiters.get(&reply.correlation) {
            Some(waiter) => waiter.reply_type,
            None => return Completion::Unknown,
        };
        if expected != reply.msg_type {
            return Completion::TypeMismatch;
        }
        if let Some(waiter) = waiters.remove(&reply.correlation) {
            // The slot holds one reply and is used once.
            let _ = waiter.slot.try_send(reply);
        }
        Completion::Delivered
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn cancel(&self, id: u32) {
        self.lock().remove(&id);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, Waiter>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A registered waiter. Dropping it unregisters the correlation id.
pub(crate) struct Ticket<'a> {
    pending: &'a PendingReplies,
    id: u32,
    rx: Receiver<Reply>,
}

impl Ticket<'_> {
    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn wait(&self, timeout: Duration) -> Option<Reply> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.pending.cancel(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipcloop_envelope::reply_type_for;
    use std::sync::Arc;
    use std::thread;

    fn reply(msg_type: i32, correlation: u32) -> Reply {
        Reply {
            msg_type,
            correlation,
            result: 0,
            content: "ok".into(),
        }
    }

    #[test]
    fn ids_are_unique_and_nonzero() {
        let pending = PendingReplies::new();
        let a = pending.register(10_001);
        let b = pending.register(10_001);
        assert_ne!(a.id(), 0);
        assert_ne!(a.id(), b.id());
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn id_allocation_skips_zero_on_wrap() {
        let pending = PendingReplies::new();
        pending.next_id.store(u32::MAX, Ordering::Relaxed);
        let first = pending.register(10_001);
        let second = pending.register(10_001);
        assert_eq!(first.id(), u32::MAX);
        assert_eq!(second.id(), 1);
    }

    #[test]
    fn matching_reply_is_delivered() {
        let pending = PendingReplies::new();
        let ticket = pending.register(reply_type_for(7));
        let outcome = pending.complete(reply(reply_type_for(7), ticket.id()));
        assert_eq!(outcome, Completion::Delivered);
        let got = ticket.wait(Duration::from_millis(10)).unwrap();
        assert_eq!(got.correlation, ticket.id());
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn wrong_type_keeps_waiter() {
        let pending = PendingReplies::new();
        let ticket = pending.register(reply_type_for(7));
        let outcome = pending.complete(reply(reply_type_for(8), ticket.id()));
        assert_eq!(outcome, Completion::TypeMismatch);
        assert!(ticket.wait(Duration::from_millis(20)).is_none());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn unknown_correlation_is_reported() {
        let pending = PendingReplies::new();
        assert_eq!(pending.complete(reply(10_001, 42)), Completion::Unknown);
    }

    #[test]
    fn dropped_ticket_unregisters() {
        let pending = PendingReplies::new();
        let id = {
            let ticket = pending.register(10_001);
            ticket.id()
        };
        assert_eq!(pending.len(), 0);
        assert_eq!(pending.complete(reply(10_001, id)), Completion::Unknown);
    }

    #[test]
    fn concurrent_waiters_receive_their_own_reply() {
        let pending = Arc::new(PendingReplies::new());
        let (ids_tx, ids_rx) = mpsc::channel();

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let pending = Arc::clone(&pending);
                let ids_tx = ids_tx.clone();
                thread::spawn(move || {
                    let ticket = pending.register(10_005);
                    ids_tx.send(ticket.id()).unwrap();
                    let got = ticket.wait(Duration::from_secs(5)).unwrap();
                    assert_eq!(got.correlation, ticket.id());
                })
            })
            .collect();

        for _ in 0..8 {
            let id = ids_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(pending.complete(reply(10_005, id)), Completion::Delivered);
        }
        for waiter in waiters {
            waiter.join().unwrap();
        }
        assert_eq!(pending.len(), 0);
    }
}
