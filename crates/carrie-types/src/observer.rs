//! Ordered observer lists for lifecycle notifications.
//!
//! Observers run synchronously on the emitting task, in registration order.
//! `emit` delivers to a snapshot of the list taken before the first call, so
//! an observer registered while an event is in flight only sees later events.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`Notifier::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub struct Notifier<E> {
    observers: RwLock<Vec<(ObserverId, Callback<E>)>>,
    next_id: AtomicU64,
}

impl<E> Notifier<E> {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers an observer; it is called after every observer registered before it.
    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        observers.push((id, Arc::new(observer)));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Delivers `event` to every currently registered observer.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = {
            let observers = self
                .observers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            observers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        for observer in snapshot {
            observer(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.len())
            .finish()
    }
}
