use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures surfaced by `SocketManager::connect()` and the transports.
///
/// Only the initial connect and the auth handshake produce these for callers;
/// steady-state trouble is reported through the connection state instead.
#[derive(Debug, ThisError)]
pub enum SocketError {
    #[error("Socket Unavailable Error: {message} {location}")]
    Unavailable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Socket Connect Timeout Error: {message} {location}")]
    ConnectTimeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Socket Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },

    #[error("Socket Auth Handshake Error: {message} {location}")]
    AuthHandshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Socket Connect Cancelled: {message} {location}")]
    Cancelled {
        message: String,
        location: ErrorLocation,
    },

    #[error("Socket Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },
}

impl From<tokio_tungstenite::tungstenite::Error> for SocketError {
    #[track_caller]
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        SocketError::Transport {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for SocketError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        SocketError::Send {
            message: format!("Failed to encode event: {error}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
