use crate::realtime::transport::{EventHandler, ListenerId};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// Event name -> handlers table shared by transport implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    handlers: Mutex<HashMap<String, Vec<(ListenerId, EventHandler)>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`. Re-registering an id replaces the earlier handler.
    pub fn add(&self, event: &str, id: ListenerId, handler: EventHandler) {
        let mut handlers = self.lock();
        let entry = handlers.entry(event.to_string()).or_default();
        entry.retain(|(existing, _)| *existing != id);
        entry.push((id, handler));
    }

    pub fn remove(&self, event: &str, id: Option<ListenerId>) {
        let mut handlers = self.lock();
        match id {
            None => {
                handlers.remove(event);
            }
            Some(id) => {
                if let Some(entry) = handlers.get_mut(event) {
                    entry.retain(|(existing, _)| *existing != id);
                    if entry.is_empty() {
                        handlers.remove(event);
                    }
                }
            }
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Call every handler for `event`. Returns how many were called.
    ///
    /// Handlers run outside the lock, so they may register or remove handlers.
    pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let snapshot: Vec<EventHandler> = self
            .lock()
            .get(event)
            .map(|entry| entry.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default();

        for handler in &snapshot {
            handler(payload);
        }

        snapshot.len()
    }

    pub fn count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<(ListenerId, EventHandler)>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
