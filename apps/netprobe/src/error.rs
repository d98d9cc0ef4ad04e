use common::ErrorLocation;

use connectivity_core::CoreError;

use thiserror::Error;

/// Errors that stop the probe from starting.
///
/// Runtime trouble (failed requests, dropped sockets) is logged and reflected
/// in status, never returned from here.
#[derive(Debug, Error)]
pub enum AppError {
    /// Error from this app
    #[error("Netprobe Error: {message} {location}")]
    Netprobe {
        message: String,
        location: ErrorLocation,
    },

    /// Error from connectivity-core (config, HTTP client construction, auth)
    #[error(transparent)]
    Core(#[from] CoreError),
}
