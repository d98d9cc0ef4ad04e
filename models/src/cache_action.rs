use serde::{Deserialize, Serialize};

/// What a socket event asks the server-state cache to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    /// Mark cached data stale; it is reloaded the next time someone reads it.
    Invalidate,
    /// Reload active queries immediately.
    Refetch,
    /// Apply an in-place update computed by application code.
    Update,
}
