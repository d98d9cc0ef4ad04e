use crate::bridge::{CacheUpdater, QueryCache};
use crate::realtime::EventHandler;

use models::{CacheKey, ModelError};

use std::sync::Arc;

use log::warn;
use serde_json::Value;

pub type KeyResolver = Arc<dyn Fn(&Value) -> Result<Vec<CacheKey>, ModelError> + Send + Sync>;

/// Application logic computing the next cached value from the current one and the event payload.
pub type CacheUpdateFn = Arc<dyn Fn(Option<Value>, &Value) -> Option<Value> + Send + Sync>;

/// Which cache keys an event touches.
#[derive(Clone)]
pub enum KeySelector {
    Fixed(Vec<CacheKey>),
    /// Keys built from the payload. A resolver error skips the event.
    Computed(KeyResolver),
}

impl KeySelector {
    pub fn fixed(keys: Vec<CacheKey>) -> Self {
        KeySelector::Fixed(keys)
    }

    pub fn computed<F>(resolver: F) -> Self
    where
        F: Fn(&Value) -> Result<Vec<CacheKey>, ModelError> + Send + Sync + 'static,
    {
        KeySelector::Computed(Arc::new(resolver))
    }

    pub fn resolve(&self, payload: &Value) -> Vec<CacheKey> {
        match self {
            KeySelector::Fixed(keys) => keys.clone(),
            KeySelector::Computed(resolver) => match resolver(payload) {
                Ok(keys) => keys,
                Err(e) => {
                    warn!("Skipping cache action; keys not derivable from payload: {e}");
                    Vec::new()
                }
            },
        }
    }
}

impl std::fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySelector::Fixed(keys) => f.debug_tuple("Fixed").field(keys).finish(),
            KeySelector::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

pub fn create_invalidation_handler(cache: Arc<dyn QueryCache>, selector: KeySelector) -> EventHandler {
    Arc::new(move |payload: &Value| {
        for key in selector.resolve(payload) {
            cache.invalidate(&key);
        }
    })
}

pub fn create_refetch_handler(cache: Arc<dyn QueryCache>, selector: KeySelector) -> EventHandler {
    Arc::new(move |payload: &Value| {
        for key in selector.resolve(payload) {
            cache.refetch(&key);
        }
    })
}

pub fn create_update_handler(
    cache: Arc<dyn QueryCache>,
    selector: KeySelector,
    updater: CacheUpdateFn,
) -> EventHandler {
    Arc::new(move |payload: &Value| {
        for key in selector.resolve(payload) {
            let updater = Arc::clone(&updater);
            let payload = payload.clone();
            let update: CacheUpdater = Box::new(move |current| updater(current, &payload));
            cache.set_data(&key, update);
        }
    })
}
