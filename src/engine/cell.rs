//! Single-writer state cells with lock-free readers.
//!
//! A [`StateCell`] publishes values two ways: a `watch` channel holding the
//! latest value for snapshot reads, and a `broadcast` channel carrying every
//! transition for observers that must not miss intermediate states. Writers
//! serialize on an internal lock, so a multi-step publication (e.g. a
//! processing state followed by a result) is never interleaved with another
//! writer's.

use std::sync::Mutex;

use tokio::sync::{broadcast, watch};

/// Default transition-stream capacity. Slow observers that fall further
/// behind than this lag rather than block the writer.
const EVENT_CAPACITY: usize = 64;

/// A state value with one logical writer role and many readers.
#[derive(Debug)]
pub struct StateCell<T: Clone + Send + 'static> {
    write: Mutex<()>,
    latest: watch::Sender<T>,
    events: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (latest, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            write: Mutex::new(()),
            latest,
            events,
        }
    }

    /// Publish a single value.
    pub fn publish(&self, value: T) {
        let _guard = self.write.lock().expect("state cell writer lock poisoned");
        self.send(value);
    }

    /// Publish a sequence of values as one atomic update: no other writer's
    /// values can appear between them.
    pub fn publish_all(&self, values: impl IntoIterator<Item = T>) {
        let _guard = self.write.lock().expect("state cell writer lock poisoned");
        for value in values {
            self.send(value);
        }
    }

    /// Publish only if `permit` still holds at publication time. The check
    /// runs under the writer lock, so a revoked permit can never race a
    /// stale emission through.
    pub fn publish_if(&self, permit: impl Fn() -> bool, value: T) -> bool {
        let _guard = self.write.lock().expect("state cell writer lock poisoned");
        if !permit() {
            return false;
        }
        self.send(value);
        true
    }

    fn send(&self, value: T) {
        self.latest.send_replace(value.clone());
        // No live observers is fine; the watch side always holds the latest.
        let _ = self.events.send(value);
    }

    /// Clone of the current value.
    pub fn snapshot(&self) -> T {
        self.latest.borrow().clone()
    }

    /// Handle for polling the latest value without blocking the writer.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.latest.subscribe()
    }

    /// Handle observing every transition from this point on.
    pub fn observe(&self) -> broadcast::Receiver<T> {
        self.events.subscribe()
    }
}
