//! Synchronous fan-out used for status subscriptions.
//!
//! Listeners are called on the thread that performed the transition, after
//! the publisher's own state lock has been released. Nothing is buffered:
//! a late subscriber sees only later transitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

pub struct Subscribers<T> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
}

impl<T: Clone + Send + 'static> Subscribers<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Register `listener`; the returned handle removes it again.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(subscribers) = weak.upgrade() {
                    subscribers.remove(id);
                }
            })),
        }
    }

    /// Deliver `value` to every listener registered at the time of the call.
    pub fn notify(&self, value: T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener registered.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
