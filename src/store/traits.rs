//! Progress store trait and change-notification plumbing.
//!
//! The store is the only writer of [`ProgressRecord`]s and the contract is
//! the backing-document-store interface the engine requires: point reads,
//! optimistic read-modify-write transactions with internal conflict retry,
//! and a per-record change stream delivering the full record after every
//! committed write, in commit order, until unsubscribed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::store::record::{ProgressRecord, RecordUpdate};

/// Outcome of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSummary {
    /// Whether a write was committed. False means the transaction body
    /// returned no update (an intentional no-op).
    pub committed: bool,
    /// The record as of the transaction: post-commit state when committed,
    /// the snapshot the body saw otherwise.
    pub record: ProgressRecord,
}

/// Trait for progress record storage backends.
///
/// The transaction body may run more than once (optimistic retry), so it
/// must be free of side effects beyond its captured locals; the last run is
/// the one that committed.
pub trait ProgressStore: Send + Sync {
    /// Point-read a record. A record never written reads as the default.
    fn read(&self, user_id: &str) -> Result<ProgressRecord>;

    /// Run one optimistic read-modify-write transaction.
    ///
    /// `op` receives the live record and returns the merge-write to commit,
    /// or `None` for an intentional no-op. Conflicts are retried internally;
    /// exhaustion surfaces as a single [`crate::LaurelError::Conflict`].
    fn transact(
        &self,
        user_id: &str,
        op: &mut dyn FnMut(&ProgressRecord) -> Option<RecordUpdate>,
    ) -> Result<TxSummary>;

    /// Subscribe to the record's change stream.
    ///
    /// The stream starts with an immediate snapshot of the current state,
    /// then yields the full record after every committed write, in commit
    /// order, until the subscription is cancelled or dropped.
    fn subscribe(&self, user_id: &str) -> Subscription;
}

/// Blanket implementation for Arc-wrapped stores.
impl<T: ProgressStore + ?Sized> ProgressStore for Arc<T> {
    fn read(&self, user_id: &str) -> Result<ProgressRecord> {
        (**self).read(user_id)
    }

    fn transact(
        &self,
        user_id: &str,
        op: &mut dyn FnMut(&ProgressRecord) -> Option<RecordUpdate>,
    ) -> Result<TxSummary> {
        (**self).transact(user_id, op)
    }

    fn subscribe(&self, user_id: &str) -> Subscription {
        (**self).subscribe(user_id)
    }
}

struct Watcher {
    id: u64,
    sender: Sender<ProgressRecord>,
}

/// Registry of change-stream watchers, shared by the store backends.
///
/// Backends call [`WatcherHub::notify`] while still holding their commit
/// lock, which is what guarantees delivery in commit order.
#[derive(Default)]
pub(crate) struct WatcherHub {
    next_id: AtomicU64,
    watchers: Mutex<HashMap<String, Vec<Watcher>>>,
}

impl WatcherHub {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a watcher and deliver the initial snapshot.
    pub(crate) fn attach(self: &Arc<Self>, user_id: &str, initial: ProgressRecord) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = channel();
        // The initial emission goes through the channel like any other, so
        // subscribers observe it as their first snapshot.
        let _ = sender.send(initial);
        self.watchers
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(Watcher { id, sender });
        Subscription {
            receiver,
            token: SubscriptionToken {
                user_id: user_id.to_string(),
                id,
                hub: Arc::clone(self),
            },
        }
    }

    /// Deliver a committed record to every watcher of `user_id`.
    pub(crate) fn notify(&self, user_id: &str, record: &ProgressRecord) {
        let mut watchers = self.watchers.lock().unwrap();
        if let Some(list) = watchers.get_mut(user_id) {
            // Watchers whose receiver is gone are pruned on the way.
            list.retain(|w| w.sender.send(record.clone()).is_ok());
        }
    }

    fn detach(&self, user_id: &str, id: u64) {
        let mut watchers = self.watchers.lock().unwrap();
        if let Some(list) = watchers.get_mut(user_id) {
            list.retain(|w| w.id != id);
            if list.is_empty() {
                watchers.remove(user_id);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn watcher_count(&self, user_id: &str) -> usize {
        self.watchers
            .lock()
            .unwrap()
            .get(user_id)
            .map(|l| l.len())
            .unwrap_or(0)
    }
}

/// Cancellation handle for a subscription.
///
/// Cancelling detaches the watcher; a receiver blocked in
/// [`Subscription::recv`] drains any already-committed snapshots and then
/// observes end-of-stream.
#[derive(Clone)]
pub struct SubscriptionToken {
    user_id: String,
    id: u64,
    hub: Arc<WatcherHub>,
}

impl SubscriptionToken {
    /// Explicitly unsubscribe.
    pub fn cancel(&self) {
        self.hub.detach(&self.user_id, self.id);
    }

    /// The record this subscription watches.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// A live change-stream subscription for one record.
pub struct Subscription {
    receiver: Receiver<ProgressRecord>,
    token: SubscriptionToken,
}

impl Subscription {
    /// Block until the next snapshot, or `None` once unsubscribed and
    /// drained.
    pub fn recv(&self) -> Option<ProgressRecord> {
        self.receiver.recv().ok()
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_recv(&self) -> Option<ProgressRecord> {
        self.receiver.try_recv().ok()
    }

    /// A cancellation handle usable from another thread.
    pub fn token(&self) -> SubscriptionToken {
        self.token.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
