use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Misuse of a [`RedactedToken`](crate::RedactedToken).
#[derive(Debug, ThisError)]
pub enum RedactError {
    /// A token reached a serializer. Tokens are memory-only; call `expose()` deliberately.
    #[error("Token Serialization Refused: {message} {location}")]
    SerializationRefused {
        message: String,
        location: ErrorLocation,
    },
}
