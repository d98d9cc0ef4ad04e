//! Retry policy: which failures are worth another attempt, and how long to wait.
//!
//! Everything here is a pure function of its arguments. The HTTP client owns
//! the loop; this module only answers questions about it.

use crate::error::HttpError;

use common::HttpStatusCode;

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================
// CONFIG
// ============================================

/// Immutable retry settings, loaded once and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: BTreeSet<u16>,
    /// Retry failures that produced no response at all (refused, reset, timed out).
    #[serde(default = "default_retry_on_network_error")]
    pub retry_on_network_error: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            retryable_status_codes: default_retryable_status_codes(),
            retry_on_network_error: default_retry_on_network_error(),
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_retryable_status_codes() -> BTreeSet<u16> {
    (400..600)
        .filter(|code| HttpStatusCode(*code).is_transient())
        .collect()
}
fn default_retry_on_network_error() -> bool {
    true
}

// ============================================
// POLICY
// ============================================

/// `true` when retries are enabled and `status` is in the configured retryable set.
pub fn is_retryable(status: u16, config: &RetryConfig) -> bool {
    config.enabled && config.retryable_status_codes.contains(&status)
}

/// Delay to wait after failed attempt number `attempt` (1-indexed).
///
/// `min(initial * multiplier^(attempt - 1), max)`. Attempt `0` is outside the
/// contract and is treated like attempt `1`.
pub fn next_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let raw = config.initial_delay_ms as f64 * config.backoff_multiplier.powi(exponent);
    let capped = raw.min(config.max_delay_ms as f64);

    Duration::from_millis(capped as u64)
}

/// Total attempts a single logical request may make.
pub fn attempts_allowed(config: &RetryConfig) -> u32 {
    if config.enabled {
        config.max_attempts.max(1)
    } else {
        1
    }
}

/// Retry decision for a concrete failure.
///
/// Errors with a status go through [`is_retryable`]; network failures have no
/// status and follow `retry_on_network_error`. Local failures never repeat.
pub fn should_retry(error: &HttpError, config: &RetryConfig) -> bool {
    if error.is_local() {
        return false;
    }

    match error.status() {
        Some(status) => is_retryable(status, config),
        None => config.enabled && config.retry_on_network_error && error.is_network(),
    }
}

// ============================================
// ATTEMPT RECORD
// ============================================

/// One attempt of one request. Lives only until the attempt is settled and logged.
#[derive(Debug)]
pub struct RequestAttempt {
    pub attempt_number: u32,
    pub elapsed: Duration,
    pub error: Option<HttpError>,
}

impl RequestAttempt {
    pub fn succeeded(attempt_number: u32, elapsed: Duration) -> Self {
        Self {
            attempt_number,
            elapsed,
            error: None,
        }
    }

    pub fn failed(attempt_number: u32, elapsed: Duration, error: HttpError) -> Self {
        Self {
            attempt_number,
            elapsed,
            error: Some(error),
        }
    }

    pub fn into_error(self) -> Option<HttpError> {
        self.error
    }
}

impl Display for RequestAttempt {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match &self.error {
            None => write!(
                formatter,
                "attempt {} succeeded in {}ms",
                self.attempt_number,
                self.elapsed.as_millis()
            ),
            Some(error) => write!(
                formatter,
                "attempt {} failed after {}ms with {}",
                self.attempt_number,
                self.elapsed.as_millis(),
                error.code()
            ),
        }
    }
}
