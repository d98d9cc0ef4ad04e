//! Cache keys shared with the server-state cache collaborator.

use crate::{ErrorLocation, ModelError};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered sequence of segments identifying cached server state.
///
/// The core never interprets segments; it only builds keys from event payloads
/// and hands them to the cache. `["posts"]` is a prefix of `["posts", 42]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(Vec<Value>);

impl CacheKey {
    /// Key made only of string segments. An empty slice yields an empty key.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        CacheKey(
            segments
                .iter()
                .map(|segment| Value::String(segment.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder::default()
    }

    pub fn segments(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if `prefix` matches the leading segments of this key.
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl Display for CacheKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", Value::Array(self.0.clone()))
    }
}

/// Builder for validated cache keys.
///
/// Segments are usually pulled out of socket payloads, so a missing field
/// shows up here as `null`; the builder rejects it instead of producing a key
/// that would match nothing.
#[derive(Debug, Default)]
pub struct CacheKeyBuilder {
    segments: Vec<Value>,
}

impl CacheKeyBuilder {
    pub fn with_segment(mut self, segment: impl Into<Value>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append a segment that may be absent; `None` becomes `null` and fails `build()`.
    pub fn with_optional_segment(mut self, segment: Option<Value>) -> Self {
        self.segments.push(segment.unwrap_or(Value::Null));
        self
    }

    #[track_caller]
    pub fn build(self) -> Result<CacheKey, ModelError> {
        if self.segments.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Cache key needs at least one segment"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(index) = self.segments.iter().position(Value::is_null) {
            return Err(ModelError::Validation {
                message: format!("Cache key segment {index} is null"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(Value::String(first)) = self.segments.first()
            && first.is_empty()
        {
            return Err(ModelError::Validation {
                message: String::from("Cache key root segment cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(CacheKey(self.segments))
    }
}
