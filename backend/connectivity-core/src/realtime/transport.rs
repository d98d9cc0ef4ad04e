use crate::error::SocketError;
use crate::realtime::config::SocketConfig;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

/// Callback invoked with an event's payload.
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identity of one registered handler, stable across transport instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ListenerId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.0)
    }
}

/// Event names with meaning to the manager and transports.
pub mod events {
    /// Transport established a connection (initial or after a reconnect).
    pub const CONNECT: &str = "connect";
    /// Established connection was lost. Payload: `{"reason": ...}`.
    pub const DISCONNECT: &str = "disconnect";
    /// A connection attempt failed. Payload: `{"message": ...}`.
    pub const CONNECT_ERROR: &str = "connect_error";
    /// Transport is about to retry on its own. Payload: `{"attempt": n}`.
    pub const RECONNECT_ATTEMPT: &str = "reconnect_attempt";
    /// Connection re-established after at least one reconnect attempt.
    pub const RECONNECT: &str = "reconnect";
    /// Transport gave up reconnecting.
    pub const RECONNECT_FAILED: &str = "reconnect_failed";

    /// Client -> server handshake carrying `{"token": ...}`.
    pub const AUTHENTICATE: &str = "authenticate";
    /// Server accepted the handshake.
    pub const AUTHENTICATED: &str = "authenticated";
    /// Server rejected the handshake. Payload: `{"message": ...}`.
    pub const UNAUTHORIZED: &str = "unauthorized";
}

/// One socket instance.
///
/// Lifecycle outcomes are reported as events through the same handler
/// registry as application events (see [`events`]). After `close()` the
/// instance is spent: handlers are gone and it never reconnects.
pub trait SocketTransport: Send + Sync {
    /// Start connecting in the background.
    fn open(&self);

    /// Close gracefully if connected, stop reconnecting, drop every handler.
    fn close(&self);

    fn on(&self, event: &str, id: ListenerId, handler: EventHandler);

    /// Remove one handler, or every handler for `event` when `id` is `None`.
    fn off(&self, event: &str, id: Option<ListenerId>);

    fn emit(&self, event: &str, data: Value) -> Result<(), SocketError>;

    fn is_connected(&self) -> bool;
}

/// Creates transports. Only supplied in contexts that can hold a live socket.
pub trait TransportFactory: Send + Sync {
    fn create(&self, config: &SocketConfig) -> Result<Arc<dyn SocketTransport>, SocketError>;
}
