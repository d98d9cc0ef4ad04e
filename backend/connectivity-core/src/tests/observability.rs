use crate::observability::{Observer, Telemetry};

use std::error::Error as StdError;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl Observer for RecordingObserver {
    fn log_info(&self, message: &str, _context: &Value) {
        self.events.lock().unwrap().push(format!("info:{message}"));
    }

    fn log_warn(&self, message: &str, _context: &Value) {
        self.events.lock().unwrap().push(format!("warn:{message}"));
    }

    fn log_error(&self, message: &str, _context: &Value) {
        self.events.lock().unwrap().push(format!("error:{message}"));
    }

    fn capture_error(&self, error: &(dyn StdError + 'static), _context: &Value) {
        self.events.lock().unwrap().push(format!("capture:{error}"));
    }
}

struct PanickingObserver;

impl Observer for PanickingObserver {
    fn log_info(&self, _message: &str, _context: &Value) {
        panic!("sink down");
    }

    fn log_warn(&self, _message: &str, _context: &Value) {
        panic!("sink down");
    }

    fn log_error(&self, _message: &str, _context: &Value) {
        panic!("sink down");
    }

    fn capture_error(&self, _error: &(dyn StdError + 'static), _context: &Value) {
        panic!("sink down");
    }
}

/// **VALUE**: Verifies telemetry forwards each level to the observer.
#[test]
fn given_observer_when_reporting_then_each_level_forwarded() {
    let observer = Arc::new(RecordingObserver::default());
    let telemetry = Telemetry::new(observer.clone());
    let error = std::io::Error::other("disk on fire");

    telemetry.info("one", json!({}));
    telemetry.warn("two", json!({}));
    telemetry.error("three", json!({}));
    telemetry.capture(&error, json!({ "k": 1 }));

    assert_eq!(
        *observer.events.lock().unwrap(),
        vec!["info:one", "warn:two", "error:three", "capture:disk on fire"]
    );
}

/// **VALUE**: Verifies a panicking sink never reaches the caller.
///
/// **WHY THIS MATTERS**: A broken crash reporter must not take requests down with it.
///
/// **BUG THIS CATCHES**: Would catch observer calls made without the unwind guard.
#[test]
fn given_panicking_observer_when_reporting_then_caller_unaffected() {
    let telemetry = Telemetry::new(Arc::new(PanickingObserver));
    let error = std::io::Error::other("boom");

    telemetry.info("a", json!({}));
    telemetry.warn("b", json!({}));
    telemetry.error("c", json!({}));
    telemetry.capture(&error, json!({}));
}
