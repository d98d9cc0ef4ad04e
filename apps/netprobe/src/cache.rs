use connectivity_core::bridge::{CacheUpdater, QueryCache};

use models::CacheKey;

use log::info;

/// Cache collaborator for the probe: there is no UI cache, so actions are logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCache;

impl QueryCache for LoggingCache {
    fn invalidate(&self, key: &CacheKey) {
        info!("Cache invalidate {key}");
    }

    fn refetch(&self, key: &CacheKey) {
        info!("Cache refetch {key}");
    }

    fn set_data(&self, key: &CacheKey, updater: CacheUpdater) {
        match updater(None) {
            Some(value) => info!("Cache set {key} = {value}"),
            None => info!("Cache clear {key}"),
        }
    }
}
