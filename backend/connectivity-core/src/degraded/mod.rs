//! Degraded mode tracker.
//!
//! Consumes one success/failure signal per logical HTTP request and exposes a
//! tri-state [`NetworkStatus`]. A run of `max_consecutive_failures` failures
//! moves the status to `Degraded`; the next success moves it back to `Online`.
//!
//! While degraded, a recovery-check ticker runs so observers can tell a check
//! is pending. The ticker does not probe the network: recovery only ever
//! comes from a real request succeeding.

use crate::observability::Telemetry;
use crate::subscribers::{Subscribers, Subscription};

use models::NetworkStatus;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedModeConfig {
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_recovery_check_interval_ms")]
    pub recovery_check_interval_ms: u64,
}

impl DegradedModeConfig {
    pub fn recovery_check_interval(&self) -> Duration {
        Duration::from_millis(self.recovery_check_interval_ms)
    }
}

impl Default for DegradedModeConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
            recovery_check_interval_ms: default_recovery_check_interval_ms(),
        }
    }
}

fn default_max_consecutive_failures() -> u32 {
    3
}
fn default_recovery_check_interval_ms() -> u64 {
    60_000
}

struct TrackerState {
    status: NetworkStatus,
    consecutive_failures: u32,
    recovery_check: Option<JoinHandle<()>>,
}

struct TrackerShared {
    config: DegradedModeConfig,
    state: Mutex<TrackerState>,
    subscribers: Arc<Subscribers<NetworkStatus>>,
    telemetry: Telemetry,
}

/// Shared handle to the process-wide network health state.
///
/// Cloning is cheap; all clones observe and mutate the same state. Each
/// transition happens inside one short critical section, and subscribers
/// are notified after it is released.
#[derive(Clone)]
pub struct DegradedModeTracker {
    shared: Arc<TrackerShared>,
}

impl DegradedModeTracker {
    pub fn new(config: DegradedModeConfig) -> Self {
        Self::with_telemetry(config, Telemetry::default())
    }

    pub fn with_telemetry(config: DegradedModeConfig, telemetry: Telemetry) -> Self {
        Self {
            shared: Arc::new(TrackerShared {
                config,
                state: Mutex::new(TrackerState {
                    status: NetworkStatus::Online,
                    consecutive_failures: 0,
                    recovery_check: None,
                }),
                subscribers: Subscribers::new(),
                telemetry,
            }),
        }
    }

    pub fn status(&self) -> NetworkStatus {
        self.lock().status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn is_recovery_check_active(&self) -> bool {
        self.lock().recovery_check.is_some()
    }

    /// Record a request that ultimately succeeded.
    pub fn record_success(&self) {
        let recovered = {
            let mut state = self.lock();
            state.consecutive_failures = 0;

            if state.status == NetworkStatus::Online {
                None
            } else {
                let previous = state.status;
                state.status = NetworkStatus::Online;
                if let Some(task) = state.recovery_check.take() {
                    task.abort();
                }
                Some(previous)
            }
        };

        if let Some(previous) = recovered {
            info!("Network recovered: {previous} -> online");
            self.shared.telemetry.info(
                "Network status recovered",
                json!({ "from": previous, "to": NetworkStatus::Online }),
            );
            self.shared.subscribers.notify(NetworkStatus::Online);
        }
    }

    /// Record a request that ultimately failed (after any retries).
    pub fn record_failure(&self) {
        let threshold = self.shared.config.max_consecutive_failures;

        let degraded = {
            let mut state = self.lock();
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            debug!(
                "Consecutive request failures: {}/{threshold}",
                state.consecutive_failures
            );

            if state.consecutive_failures >= threshold && state.status != NetworkStatus::Degraded
            {
                let previous = state.status;
                state.status = NetworkStatus::Degraded;
                state.recovery_check = self.spawn_recovery_check();
                Some((previous, state.consecutive_failures))
            } else {
                None
            }
        };

        if let Some((previous, failures)) = degraded {
            warn!("Network degraded after {failures} consecutive failures");
            self.shared.telemetry.warn(
                "Network status degraded",
                json!({ "from": previous, "to": NetworkStatus::Degraded, "consecutiveFailures": failures }),
            );
            self.shared.subscribers.notify(NetworkStatus::Degraded);
        }
    }

    /// Enter `Offline` on an external connectivity signal (e.g. the OS reporting no network).
    pub fn mark_offline(&self) {
        let changed = {
            let mut state = self.lock();
            if state.status == NetworkStatus::Offline {
                false
            } else {
                state.status = NetworkStatus::Offline;
                if let Some(task) = state.recovery_check.take() {
                    task.abort();
                }
                true
            }
        };

        if changed {
            warn!("Network marked offline");
            self.shared
                .telemetry
                .warn("Network status offline", json!({ "to": NetworkStatus::Offline }));
            self.shared.subscribers.notify(NetworkStatus::Offline);
        }
    }

    /// Listen for status transitions. The listener is not called with the current status.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(NetworkStatus) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(listener)
    }

    /// Return to a fresh `Online` state without notifying anyone. Test hook.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.status = NetworkStatus::Online;
        state.consecutive_failures = 0;
        if let Some(task) = state.recovery_check.take() {
            task.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_recovery_check(&self) -> Option<JoinHandle<()>> {
        let Ok(runtime) = RuntimeHandle::try_current() else {
            warn!("No async runtime available; recovery check ticker not started");
            return None;
        };

        let period = self
            .shared
            .config
            .recovery_check_interval()
            .max(Duration::from_millis(1));
        let telemetry = self.shared.telemetry.clone();

        Some(runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                telemetry.info(
                    "Recovery check in progress; waiting for next successful request",
                    json!({ "intervalMs": period.as_millis() as u64 }),
                );
            }
        }))
    }
}

impl Drop for TrackerShared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = state.recovery_check.take() {
            task.abort();
        }
    }
}
