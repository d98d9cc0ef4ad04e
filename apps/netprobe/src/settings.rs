//! Process settings read from the environment (and `.env`, loaded by `main`).

use std::path::PathBuf;
use std::time::Duration;

const CONFIG_PATH_VAR: &str = "NETPROBE_CONFIG";
const LOG_DIR_VAR: &str = "NETPROBE_LOG_DIR";
const SESSION_TOKEN_VAR: &str = "NETPROBE_SESSION_TOKEN";
const SOCKET_TOKEN_VAR: &str = "NETPROBE_SOCKET_TOKEN";
const HEALTH_ENDPOINT_VAR: &str = "NETPROBE_HEALTH_ENDPOINT";
const POLL_INTERVAL_VAR: &str = "NETPROBE_POLL_INTERVAL_MS";

const DEFAULT_CONFIG_PATH: &str = "netprobe.toml";
const DEFAULT_HEALTH_ENDPOINT: &str = "health";
const DEFAULT_POLL_INTERVAL_MS: u64 = 15_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    pub log_dir: PathBuf,
    pub session_token: Option<String>,
    /// Fixed socket token; when absent the token endpoint from config is used.
    pub socket_token: Option<String>,
    pub health_endpoint: String,
    pub poll_interval: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let poll_interval_ms = non_blank(POLL_INTERVAL_VAR)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        Self {
            config_path: non_blank(CONFIG_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            log_dir: non_blank(LOG_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            session_token: non_blank(SESSION_TOKEN_VAR),
            socket_token: non_blank(SOCKET_TOKEN_VAR),
            health_endpoint: non_blank(HEALTH_ENDPOINT_VAR)
                .unwrap_or_else(|| DEFAULT_HEALTH_ENDPOINT.to_string()),
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }
}
