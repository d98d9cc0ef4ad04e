//! Event-to-cache bridge.
//!
//! Translates server-pushed socket events into actions on the server-state
//! cache. Payloads only ever select keys or feed application-supplied
//! updaters; they are never written into the cache verbatim.
//!
//! Thanks to the manager's replayed registration list,
//! [`setup_socket_event_mappings`] runs once at start-up rather than after
//! every reconnect.

mod handlers;
mod mappings;

pub use handlers::{
    CacheUpdateFn, KeyResolver, KeySelector, create_invalidation_handler,
    create_refetch_handler, create_update_handler,
};
pub use mappings::{SocketEventMapping, default_event_mappings, event_names};

use crate::realtime::{ListenerId, SocketManager};

use models::CacheKey;

use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

/// Computes the next cached value from the current one. `None` means "not cached".
pub type CacheUpdater = Box<dyn FnOnce(Option<Value>) -> Option<Value> + Send>;

/// Server-state cache collaborator.
pub trait QueryCache: Send + Sync {
    /// Mark entries under `key` stale.
    fn invalidate(&self, key: &CacheKey);

    /// Reload active entries under `key` now.
    fn refetch(&self, key: &CacheKey);

    fn set_data(&self, key: &CacheKey, updater: CacheUpdater);
}

/// Registered mappings. Dropping the bridge leaves them registered; call
/// [`EventBridge::teardown`] to remove them.
#[must_use = "keep the bridge to be able to tear the mappings down"]
pub struct EventBridge {
    manager: SocketManager,
    listeners: Vec<(String, ListenerId)>,
}

impl EventBridge {
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.listeners.iter().map(|(event, _)| event.as_str())
    }

    /// Remove every handler this bridge registered.
    pub fn teardown(self) {
        for (event, id) in &self.listeners {
            self.manager.off(event, Some(*id));
        }
        info!("Removed {} socket-to-cache mapping(s)", self.listeners.len());
    }
}

/// Register one handler per mapping on `manager`.
pub fn setup_socket_event_mappings(
    manager: &SocketManager,
    cache: Arc<dyn QueryCache>,
    mappings: Vec<SocketEventMapping>,
) -> EventBridge {
    let listeners = mappings
        .into_iter()
        .map(|mapping| {
            debug!(
                "Mapping socket event '{}' to cache {:?}",
                mapping.event(),
                mapping.action()
            );
            let handler = mapping.handler(Arc::clone(&cache));
            let id = manager.on_handler(mapping.event(), handler);
            (mapping.event().to_string(), id)
        })
        .collect::<Vec<_>>();

    info!("Registered {} socket-to-cache mapping(s)", listeners.len());

    EventBridge {
        manager: manager.clone(),
        listeners,
    }
}
