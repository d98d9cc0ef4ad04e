//! Real-time socket connectivity.
//!
//! [`SocketManager`] owns at most one live [`SocketTransport`] and drives the
//! connection state machine. Transports come from an injected
//! [`TransportFactory`]; a manager built without one (server-side contexts)
//! refuses to connect. [`WsTransportFactory`] is the production transport.

mod config;
mod manager;
mod registry;
mod transport;
mod ws;

pub use config::SocketConfig;
pub use manager::SocketManager;
pub use registry::ListenerRegistry;
pub use transport::{EventHandler, ListenerId, SocketTransport, TransportFactory, events};
pub use ws::{WsTransport, WsTransportFactory};
