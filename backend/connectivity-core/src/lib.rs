//! Network resilience and real-time connectivity core.
//!
//! Sits between application code and two transports - request/response HTTP
//! and one persistent socket - and gives both the same retry, timeout,
//! degraded-mode and reconnection behavior.
//!
//! Components, leaves first:
//!
//! - [`retry`] - pure retry decisions and backoff delays
//! - [`degraded`] - tri-state network health fed by request outcomes
//! - [`http`] - request client with timeouts, typed errors and retries
//! - [`realtime`] - the socket connection manager and its transports
//! - [`bridge`] - socket events turned into cache invalidations
//!
//! Collaborators (auth, observability, cache) are traits in [`auth`],
//! [`observability`] and [`bridge`]; the application supplies them once at
//! start-up and hands the resulting handles around.

pub mod auth;
pub mod bridge;
pub mod config;
pub mod degraded;
pub mod error;
pub mod http;
pub mod observability;
pub mod realtime;
pub mod retry;
pub mod subscribers;

#[cfg(test)]
mod tests;

pub use config::NetworkConfig;
pub use error::CoreError;

pub const CORE_NAME: &str = "connectivity-core";
pub const USER_AGENT: &str = const_format::concatcp!(CORE_NAME, "/", env!("CARGO_PKG_VERSION"));
pub const REQUEST_ID_HEADER: &str = "x-request-id";
