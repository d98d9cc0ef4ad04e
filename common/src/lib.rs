//! Shared primitives for the connectivity workspace.
//!
//! Everything here is dependency-light and used by more than one crate:
//!
//! - [`ErrorLocation`] - source location captured by every error variant
//! - [`HttpStatusCode`] - status code categorization for retry decisions
//! - [`RedactedToken`] - auth tokens that never leak into logs
//!
//! ## Architecture
//!
//! - **common** (this crate): primitives with no domain knowledge
//! - **models**: pure data describing connectivity state
//! - **connectivity-core**: retry, degraded mode, HTTP and socket logic
//! - **netprobe**: application wiring everything together

pub mod error;
pub mod http_status;
pub mod redacted_token;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use redacted_token::RedactedToken;
