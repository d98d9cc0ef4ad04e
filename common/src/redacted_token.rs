//! Auth tokens with redacted Debug/Display output.

use crate::{ErrorLocation, RedactError};

use std::fmt;

use serde::ser::Error;
use zeroize::Zeroize;

/// A bearer or socket auth token that never exposes its value in logs or debug output.
///
/// The backing string is zeroed on drop, and serialization is refused so a token
/// can't end up in a config file or cache entry by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct RedactedToken {
    inner: String,
}

impl RedactedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    /// Build a token from an optional raw value, treating blank strings as absent.
    pub fn from_optional(token: Option<String>) -> Option<Self> {
        token
            .filter(|value| !value.trim().is_empty())
            .map(Self::new)
    }

    /// Get the actual token value for transmission.
    ///
    /// # Security Note
    /// Only call this when writing the token onto the wire.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Token length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedToken([REDACTED])")
    }
}

impl fmt::Display for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED TOKEN]")
    }
}

impl Drop for RedactedToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Tokens are memory-only
impl serde::Serialize for RedactedToken {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(RedactError::SerializationRefused {
            message: String::from("RedactedToken cannot be serialized - use expose() explicitly"),
            location: ErrorLocation::here(),
        }))
    }
}
