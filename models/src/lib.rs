//! Domain models for the connectivity core.
//!
//! This crate contains pure data structures describing connectivity state
//! and the vocabulary shared with the UI and cache collaborators. Models
//! have no business logic - the state machines that drive them live in
//! `connectivity-core`.

pub mod auth_signal;
pub mod cache_action;
pub mod cache_key;
pub mod connection_state;
pub mod error;
pub mod network_status;


pub use auth_signal::AuthSignal;
pub use cache_action::CacheAction;
pub use cache_key::{CacheKey, CacheKeyBuilder};
pub use common::ErrorLocation;
pub use connection_state::ConnectionState;
pub use error::model_error::ModelError;
pub use network_status::NetworkStatus;
