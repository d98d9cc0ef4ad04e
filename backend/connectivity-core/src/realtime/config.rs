use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Endpoint returning `{"token": ...}` for the authenticate handshake.
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_auth_timeout_ms")]
    pub auth_timeout_ms: u64,
    #[serde(default = "default_reconnection")]
    pub reconnection: bool,
    #[serde(default = "default_reconnection_attempts")]
    pub reconnection_attempts: u32,
    #[serde(default = "default_reconnection_delay_ms")]
    pub reconnection_delay_ms: u64,
    #[serde(default = "default_reconnection_delay_max_ms")]
    pub reconnection_delay_max_ms: u64,
}

impl SocketConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn reconnection_delay(&self) -> Duration {
        Duration::from_millis(self.reconnection_delay_ms)
    }

    pub fn reconnection_delay_max(&self) -> Duration {
        Duration::from_millis(self.reconnection_delay_max_ms)
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token_endpoint: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            auth_timeout_ms: default_auth_timeout_ms(),
            reconnection: default_reconnection(),
            reconnection_attempts: default_reconnection_attempts(),
            reconnection_delay_ms: default_reconnection_delay_ms(),
            reconnection_delay_max_ms: default_reconnection_delay_max_ms(),
        }
    }
}

fn default_url() -> String {
    "ws://127.0.0.1:8080/socket".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_auth_timeout_ms() -> u64 {
    5_000
}
fn default_reconnection() -> bool {
    true
}
fn default_reconnection_attempts() -> u32 {
    5
}
fn default_reconnection_delay_ms() -> u64 {
    1_000
}
fn default_reconnection_delay_max_ms() -> u64 {
    5_000
}
