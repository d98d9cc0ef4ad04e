//! Process-wide network configuration.
//!
//! Read once at start-up: TOML file (every field optional), then `NETPROBE_*`
//! environment overrides, then validation. The resulting value is immutable;
//! components copy the sections they need.

use crate::degraded::DegradedModeConfig;
use crate::error::ConfigError;
use crate::http::{HttpConfig, TimeoutConfig};
use crate::realtime::SocketConfig;
use crate::retry::RetryConfig;

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "NETPROBE_";

// ============================================
// CONFIG STRUCT
// ============================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub degraded: DegradedModeConfig,

    #[serde(default)]
    pub socket: SocketConfig,
}

// ============================================
// LOADING
// ============================================

impl NetworkConfig {
    /// Load config from a TOML file.
    ///
    /// A missing file yields defaults. Environment overrides are not applied
    /// here; see [`NetworkConfig::apply_env_overrides`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, does not
    /// parse, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read config file {}: {e}", path.display());
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        let config = Self::parse(&contents).map_err(|reason| {
            warn!("Failed to parse config TOML {}: {reason}", path.display());
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason,
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(contents).map_err(|reason| ConfigError::ParseError {
            location: ErrorLocation::from(Location::caller()),
            path: "<inline>".into(),
            reason,
        })?;

        config.validate()?;
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Apply `NETPROBE_*` variables from the process environment, then re-validate.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup` (called with full variable names), then re-validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OverrideError`] when a variable is set but does
    /// not parse, and [`ConfigError::ValidationError`] when the result is invalid.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = Overrides { lookup: &lookup };

        overrides.string("HTTP_BASE_URL", &mut self.http.base_url);
        overrides.parsed("TIMEOUT_DEFAULT_MS", &mut self.timeouts.default_ms)?;
        overrides.parsed("TIMEOUT_CRITICAL_MS", &mut self.timeouts.critical_ms)?;
        overrides.parsed("TIMEOUT_BACKGROUND_MS", &mut self.timeouts.background_ms)?;

        overrides.parsed("RETRY_ENABLED", &mut self.retry.enabled)?;
        overrides.parsed("RETRY_MAX_ATTEMPTS", &mut self.retry.max_attempts)?;
        overrides.parsed("RETRY_INITIAL_DELAY_MS", &mut self.retry.initial_delay_ms)?;
        overrides.parsed("RETRY_MAX_DELAY_MS", &mut self.retry.max_delay_ms)?;

        overrides.parsed(
            "DEGRADED_MAX_FAILURES",
            &mut self.degraded.max_consecutive_failures,
        )?;
        overrides.parsed(
            "DEGRADED_RECOVERY_INTERVAL_MS",
            &mut self.degraded.recovery_check_interval_ms,
        )?;

        overrides.string("SOCKET_URL", &mut self.socket.url);
        if let Some(endpoint) = overrides.get("SOCKET_TOKEN_ENDPOINT") {
            self.socket.token_endpoint = Some(endpoint).filter(|value| !value.trim().is_empty());
        }
        overrides.parsed("SOCKET_RECONNECTION", &mut self.socket.reconnection)?;
        overrides.parsed(
            "SOCKET_RECONNECTION_ATTEMPTS",
            &mut self.socket.reconnection_attempts,
        )?;

        self.validate()?;
        Ok(self)
    }

    // ============================================
    // VALIDATION
    // ============================================

    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.http.base_url.starts_with("http://") && !self.http.base_url.starts_with("https://")
        {
            return Err(invalid(format!(
                "Invalid http.base_url: {} (must be http:// or https://)",
                self.http.base_url
            )));
        }

        if self.timeouts.default_ms == 0
            || self.timeouts.critical_ms == 0
            || self.timeouts.background_ms == 0
        {
            return Err(invalid("Request timeouts must be greater than 0ms".to_string()));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1".to_string()));
        }
        if retry.initial_delay_ms == 0 || retry.max_delay_ms < retry.initial_delay_ms {
            return Err(invalid(format!(
                "Invalid retry delays: initial {}ms, max {}ms (need 0 < initial <= max)",
                retry.initial_delay_ms, retry.max_delay_ms
            )));
        }
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier <= 1.0 {
            return Err(invalid(format!(
                "Invalid retry.backoff_multiplier: {} (must be > 1)",
                retry.backoff_multiplier
            )));
        }

        if self.degraded.max_consecutive_failures == 0 {
            return Err(invalid(
                "degraded.max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        if self.degraded.recovery_check_interval_ms == 0 {
            return Err(invalid(
                "degraded.recovery_check_interval_ms must be greater than 0".to_string(),
            ));
        }

        let socket = &self.socket;
        if !socket.url.starts_with("ws://") && !socket.url.starts_with("wss://") {
            return Err(invalid(format!(
                "Invalid socket.url: {} (must be ws:// or wss://)",
                socket.url
            )));
        }
        if let Some(endpoint) = &socket.token_endpoint
            && !endpoint.starts_with("http://")
            && !endpoint.starts_with("https://")
        {
            return Err(invalid(format!(
                "Invalid socket.token_endpoint: {endpoint}"
            )));
        }
        if socket.connect_timeout_ms == 0 || socket.auth_timeout_ms == 0 {
            return Err(invalid(
                "Socket connect and auth timeouts must be greater than 0ms".to_string(),
            ));
        }
        if socket.reconnection_delay_max_ms < socket.reconnection_delay_ms {
            return Err(invalid(format!(
                "Invalid socket reconnection delays: {}ms > max {}ms",
                socket.reconnection_delay_ms, socket.reconnection_delay_max_ms
            )));
        }

        Ok(())
    }
}

#[track_caller]
fn invalid(reason: String) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason,
    }
}

struct Overrides<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Overrides<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
    }

    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = self.get(key) {
            *target = value;
        }
    }

    #[track_caller]
    fn parsed<T>(&self, key: &str, target: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.get(key) else {
            return Ok(());
        };

        *target = raw.trim().parse().map_err(|e: T::Err| ConfigError::OverrideError {
            location: ErrorLocation::from(Location::caller()),
            variable: format!("{ENV_PREFIX}{key}"),
            reason: format!("'{raw}': {e}"),
        })?;

        Ok(())
    }
}
