//! HTTP request client.
//!
//! [`HttpClient::request`] wraps one logical call: URL resolution, auth
//! header injection, a timeout race per attempt, classification of failures
//! into [`HttpError`](crate::error::HttpError), retries driven by
//! [`crate::retry`], and exactly one report to the degraded mode tracker.

mod classify;
mod client;
mod config;
mod options;
mod response;

pub use client::HttpClient;
pub use config::{HttpConfig, TimeoutConfig, TimeoutProfile};
pub use options::RequestOptions;
pub use response::Response;

pub(crate) use classify::{classify_failure, decode_body};
