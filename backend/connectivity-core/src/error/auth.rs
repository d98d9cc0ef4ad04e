use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("Token Fetch Error: {message} {location}")]
    TokenFetch {
        message: String,
        location: ErrorLocation,
    },

    #[error("Token Decode Error: {message} {location}")]
    TokenDecode {
        message: String,
        location: ErrorLocation,
    },
}

impl From<reqwest::Error> for AuthError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        AuthError::TokenFetch {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for AuthError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        AuthError::TokenFetch {
            message: format!("Invalid token endpoint: {error}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
