//! Observability collaborator.
//!
//! The core reports through [`Telemetry`], which forwards to an injected
//! [`Observer`]. Sinks are fire-and-forget: a panicking sink is caught and
//! logged, never propagated into a request or connection.

use std::error::Error as StdError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::{error, info, warn};
use serde_json::Value;

pub trait Observer: Send + Sync {
    fn log_info(&self, message: &str, context: &Value);
    fn log_warn(&self, message: &str, context: &Value);
    fn log_error(&self, message: &str, context: &Value);

    /// Report an unrecoverable failure.
    fn capture_error(&self, error: &(dyn StdError + 'static), context: &Value);
}

/// Observer that writes to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn log_info(&self, message: &str, context: &Value) {
        info!("{message} {context}");
    }

    fn log_warn(&self, message: &str, context: &Value) {
        warn!("{message} {context}");
    }

    fn log_error(&self, message: &str, context: &Value) {
        error!("{message} {context}");
    }

    fn capture_error(&self, error: &(dyn StdError + 'static), context: &Value) {
        error!("Captured error: {error} {context}");
    }
}

#[derive(Clone)]
pub struct Telemetry {
    observer: Arc<dyn Observer>,
}

impl Telemetry {
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self { observer }
    }

    pub fn info(&self, message: &str, context: Value) {
        self.guard("log_info", |observer| observer.log_info(message, &context));
    }

    pub fn warn(&self, message: &str, context: Value) {
        self.guard("log_warn", |observer| observer.log_warn(message, &context));
    }

    pub fn error(&self, message: &str, context: Value) {
        self.guard("log_error", |observer| observer.log_error(message, &context));
    }

    pub fn capture(&self, error: &(dyn StdError + 'static), context: Value) {
        self.guard("capture_error", |observer| {
            observer.capture_error(error, &context)
        });
    }

    fn guard<F>(&self, operation: &str, call: F)
    where
        F: FnOnce(&dyn Observer),
    {
        let observer = self.observer.as_ref();
        if catch_unwind(AssertUnwindSafe(|| call(observer))).is_err() {
            error!("Observer panicked during {operation}; event dropped");
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new(Arc::new(LogObserver))
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Telemetry")
    }
}
