use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api/".to_string()
}

/// Which configured timeout a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutProfile {
    #[default]
    Default,
    /// User is waiting on the result; fail fast.
    Critical,
    /// Prefetches and sync jobs; allowed to take longer.
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_timeout_ms")]
    pub default_ms: u64,
    #[serde(default = "critical_timeout_ms")]
    pub critical_ms: u64,
    #[serde(default = "background_timeout_ms")]
    pub background_ms: u64,
}

impl TimeoutConfig {
    pub fn for_profile(&self, profile: TimeoutProfile) -> Duration {
        let millis = match profile {
            TimeoutProfile::Default => self.default_ms,
            TimeoutProfile::Critical => self.critical_ms,
            TimeoutProfile::Background => self.background_ms,
        };
        Duration::from_millis(millis)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: default_timeout_ms(),
            critical_ms: critical_timeout_ms(),
            background_ms: background_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn critical_timeout_ms() -> u64 {
    10_000
}
fn background_timeout_ms() -> u64 {
    60_000
}
