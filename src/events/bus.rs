//! Ordered multi-subscriber event delivery
//!
//! Producers [`enqueue`](EventBus::enqueue) events while they still hold the
//! lock that made the state change, so the outbox order is the order in which
//! the changes happened. They [`flush`](EventBus::flush) after releasing that
//! lock. One flusher at a time drains the outbox and invokes subscribers in
//! registration order; a concurrent flush returns at once and its events are
//! delivered by the active flusher, possibly on that caller's thread.
//!
//! A subscriber must not block indefinitely. Re-entering the matchmaker from a
//! callback is safe because no engine lock is held during delivery; events the
//! callback produces are delivered after the current one.

use crate::types::MatchEvent;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};
use tracing::{debug, error, warn};

/// Handle returned by [`EventBus::subscribe`]
pub type SubscriptionId = u64;

/// Receives matchmaking outcomes
pub trait EventSubscriber<P, C>: Send + Sync {
    fn on_event(&self, event: &MatchEvent<P, C>);
}

impl<P, C, F> EventSubscriber<P, C> for F
where
    F: Fn(&MatchEvent<P, C>) + Send + Sync,
{
    fn on_event(&self, event: &MatchEvent<P, C>) {
        self(event)
    }
}

type SubscriberList<P, C> = Vec<(SubscriptionId, Arc<dyn EventSubscriber<P, C>>)>;

/// Ordered list of subscriber callbacks
pub struct EventBus<P, C> {
    subscribers: RwLock<SubscriberList<P, C>>,
    next_id: AtomicU64,
    /// Leaf lock; taken while producer state locks are held
    outbox: Mutex<VecDeque<MatchEvent<P, C>>>,
    delivery: Mutex<()>,
}

impl<P, C> Default for EventBus<P, C> {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            outbox: Mutex::new(VecDeque::new()),
            delivery: Mutex::new(()),
        }
    }
}

impl<P, C> EventBus<P, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; it receives events after every earlier subscriber
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber<P, C>>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.push((id, subscriber));
        debug!("Registered event subscriber {} ({} total)", id, subscribers.len());
        id
    }

    /// Remove a subscriber; returns false if the id was unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        before != subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Append events to the outbox without delivering them
    ///
    /// Call while holding the lock that produced the events, then call
    /// [`flush`](Self::flush) once that lock is released.
    pub fn enqueue(&self, events: impl IntoIterator<Item = MatchEvent<P, C>>) {
        self.outbox_lock().extend(events);
    }

    pub fn push(&self, event: MatchEvent<P, C>) {
        self.outbox_lock().push_back(event);
    }

    /// Deliver everything in the outbox, in order, to every subscriber
    ///
    /// Returns without delivering if another flush is in progress; that
    /// flusher picks up whatever is queued. A panicking subscriber is logged
    /// and skipped for that event; the remaining subscribers and events are
    /// still delivered.
    pub fn flush(&self) {
        loop {
            let delivery = match self.delivery.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => return,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            };

            loop {
                let batch: Vec<_> = self.outbox_lock().drain(..).collect();
                if batch.is_empty() {
                    break;
                }
                self.deliver(&batch);
            }
            drop(delivery);

            // An enqueue that lost the race for the delivery lock after our
            // last drain is ours to deliver
            if self.outbox_lock().is_empty() {
                return;
            }
        }
    }

    fn deliver(&self, events: &[MatchEvent<P, C>]) {
        let subscribers: Vec<_> = match self.subscribers.read() {
            Ok(subscribers) => subscribers.clone(),
            Err(poisoned) => {
                warn!("Event subscriber list lock was poisoned, recovering");
                poisoned.into_inner().clone()
            }
        };

        for event in events {
            for (id, subscriber) in &subscribers {
                let delivered = catch_unwind(AssertUnwindSafe(|| subscriber.on_event(event)));
                if delivered.is_err() {
                    error!(
                        "Event subscriber {} panicked while handling {} event",
                        id,
                        event.kind()
                    );
                }
            }
        }
    }

    fn outbox_lock(&self) -> MutexGuard<'_, VecDeque<MatchEvent<P, C>>> {
        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
