use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use serde_json::Value;
use thiserror::Error as ThisError;

pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";
pub const TIMEOUT_ERROR_CODE: &str = "TIMEOUT";
pub const INVALID_URL_CODE: &str = "INVALID_URL";
pub const DECODE_ERROR_CODE: &str = "DECODE_ERROR";

/// Closed taxonomy of failures returned by [`HttpClient`](crate::http::HttpClient).
///
/// Status-specific variants exist for the codes callers branch on; everything
/// else lands in [`HttpError::Request`] with the status, a machine-readable
/// code and any details the backend put in the body.
#[derive(Debug, ThisError)]
pub enum HttpError {
    #[error("Unauthorized Error: {message} {location}")]
    Unauthorized {
        message: String,
        location: ErrorLocation,
    },

    #[error("Forbidden Error: {message} {location}")]
    Forbidden {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Found Error: {message} {location}")]
    NotFound {
        message: String,
        location: ErrorLocation,
    },

    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        details: Option<Value>,
        location: ErrorLocation,
    },

    /// No response was received: connection failure, reset, or timeout.
    #[error("Network Error: {message} {location}")]
    Network {
        message: String,
        timed_out: bool,
        location: ErrorLocation,
    },

    #[error("Request Error: HTTP {status} {code}: {message} {location}")]
    Request {
        status: u16,
        code: String,
        message: String,
        details: Option<Value>,
        location: ErrorLocation,
    },
}

impl HttpError {
    /// HTTP status carried by the error; `None` for network failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Unauthorized { .. } => Some(HttpStatusCode::UNAUTHORIZED.as_u16()),
            HttpError::Forbidden { .. } => Some(HttpStatusCode::FORBIDDEN.as_u16()),
            HttpError::NotFound { .. } => Some(HttpStatusCode::NOT_FOUND.as_u16()),
            HttpError::Validation { .. } => Some(HttpStatusCode::UNPROCESSABLE_ENTITY.as_u16()),
            HttpError::Network { .. } => None,
            HttpError::Request { status, .. } => Some(*status),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            HttpError::Unauthorized { .. } => "UNAUTHORIZED",
            HttpError::Forbidden { .. } => "FORBIDDEN",
            HttpError::NotFound { .. } => "NOT_FOUND",
            HttpError::Validation { .. } => "VALIDATION_ERROR",
            HttpError::Network { timed_out: true, .. } => TIMEOUT_ERROR_CODE,
            HttpError::Network { .. } => NETWORK_ERROR_CODE,
            HttpError::Request { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HttpError::Unauthorized { message, .. }
            | HttpError::Forbidden { message, .. }
            | HttpError::NotFound { message, .. }
            | HttpError::Validation { message, .. }
            | HttpError::Network { message, .. }
            | HttpError::Request { message, .. } => message,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            HttpError::Validation { details, .. } | HttpError::Request { details, .. } => {
                details.as_ref()
            }
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, HttpError::Network { .. })
    }

    /// Failure produced on this side (bad URL, undecodable body) rather than by the server.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            HttpError::Request { code, .. } if code == INVALID_URL_CODE || code == DECODE_ERROR_CODE
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Network { timed_out: true, .. })
    }

    /// Wrap an unexpected failure as a generic 500.
    #[track_caller]
    pub fn unknown(message: impl Into<String>) -> Self {
        HttpError::Request {
            status: HttpStatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            code: UNKNOWN_ERROR_CODE.to_string(),
            message: message.into(),
            details: None,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for HttpError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        HttpError::Request {
            status: HttpStatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            code: INVALID_URL_CODE.to_string(),
            message: error.to_string(),
            details: None,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for HttpError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        HttpError::Network {
            timed_out: error.is_timeout(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for HttpError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        HttpError::Request {
            status: HttpStatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            code: DECODE_ERROR_CODE.to_string(),
            message: error.to_string(),
            details: None,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
