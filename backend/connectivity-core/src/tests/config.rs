use crate::config::NetworkConfig;
use crate::error::ConfigError;

use std::collections::HashMap;
use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

/// **VALUE**: Verifies the documented defaults.
#[test]
fn given_defaults_when_inspected_then_match_documented_values() {
    let config = NetworkConfig::default();

    assert_eq!(config.timeouts.default_ms, 30_000);
    assert_eq!(config.timeouts.critical_ms, 10_000);
    assert_eq!(config.timeouts.background_ms, 60_000);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.degraded.max_consecutive_failures, 3);
    assert_eq!(config.degraded.recovery_check_interval_ms, 60_000);
    assert_eq!(config.socket.connect_timeout_ms, 10_000);
    assert_eq!(config.socket.auth_timeout_ms, 5_000);
    assert_eq!(config.socket.reconnection_attempts, 5);
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies a missing file yields defaults instead of an error.
///
/// **WHY THIS MATTERS**: First runs have no config file.
#[test]
fn given_missing_file_when_loading_then_defaults() {
    // GIVEN: A directory with no config in it
    let dir = TempDir::new().unwrap();

    // WHEN
    let config = NetworkConfig::load(&dir.path().join("network.toml")).unwrap();

    // THEN
    assert_eq!(config, NetworkConfig::default());
}

/// **VALUE**: Verifies partial TOML fills the rest from defaults.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` making every field mandatory.
#[test]
fn given_partial_toml_when_loading_then_unspecified_fields_default() {
    // GIVEN: A file overriding two values
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[http]
base_url = "https://api.example.com/v1/"

[retry]
max_attempts = 5
retryable_status_codes = [503]
"#
    )
    .unwrap();

    // WHEN
    let config = NetworkConfig::load(file.path()).unwrap();

    // THEN
    assert_eq!(config.http.base_url, "https://api.example.com/v1/");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.retryable_status_codes.len(), 1);
    assert_eq!(config.retry.initial_delay_ms, 1_000);
    assert_eq!(config.socket, Default::default());
}

/// **VALUE**: Verifies malformed TOML is reported as a parse error with the path.
#[test]
fn given_malformed_toml_when_loading_then_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[retry\nmax_attempts = ").unwrap();

    let result = NetworkConfig::load(file.path());

    assert!(matches!(result, Err(ConfigError::ParseError { ref path, .. }) if path == file.path()));
}

/// **VALUE**: Verifies invalid values are rejected at load time.
///
/// **WHY THIS MATTERS**: A zero timeout or a multiplier of 1 breaks every request at runtime instead.
#[test]
fn given_invalid_values_when_validating_then_validation_error() {
    let cases = [
        "[retry]\nmax_attempts = 0",
        "[retry]\nbackoff_multiplier = 1.0",
        "[retry]\ninitial_delay_ms = 5000\nmax_delay_ms = 1000",
        "[degraded]\nmax_consecutive_failures = 0",
        "[timeouts]\ncritical_ms = 0",
        "[http]\nbase_url = \"ftp://example.com\"",
        "[socket]\nurl = \"http://example.com/socket\"",
        "[socket]\nauth_timeout_ms = 0",
    ];

    for case in cases {
        let result = NetworkConfig::from_toml_str(case);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "expected validation error for {case:?}"
        );
    }
}

/// **VALUE**: Verifies environment overrides win over the file.
#[test]
fn given_overrides_when_applied_then_values_replaced() {
    // GIVEN: An override table
    let env: HashMap<&str, &str> = HashMap::from([
        ("NETPROBE_HTTP_BASE_URL", "https://staging.example.com/api/"),
        ("NETPROBE_RETRY_ENABLED", "false"),
        ("NETPROBE_DEGRADED_MAX_FAILURES", "5"),
        ("NETPROBE_SOCKET_URL", "wss://staging.example.com/socket"),
        ("NETPROBE_SOCKET_TOKEN_ENDPOINT", "https://staging.example.com/api/socket-token"),
    ]);

    // WHEN
    let config = NetworkConfig::default()
        .apply_overrides(|name| env.get(name).map(|value| value.to_string()))
        .unwrap();

    // THEN
    assert_eq!(config.http.base_url, "https://staging.example.com/api/");
    assert!(!config.retry.enabled);
    assert_eq!(config.degraded.max_consecutive_failures, 5);
    assert_eq!(config.socket.url, "wss://staging.example.com/socket");
    assert_eq!(
        config.socket.token_endpoint.as_deref(),
        Some("https://staging.example.com/api/socket-token")
    );
}

/// **VALUE**: Verifies a malformed override names the variable.
///
/// **BUG THIS CATCHES**: Would catch a typo in an env var silently falling back to the default.
#[test]
fn given_unparseable_override_when_applied_then_override_error() {
    let result = NetworkConfig::default().apply_overrides(|name| {
        (name == "NETPROBE_RETRY_MAX_ATTEMPTS").then(|| "three".to_string())
    });

    match result {
        Err(ConfigError::OverrideError { variable, .. }) => {
            assert_eq!(variable, "NETPROBE_RETRY_MAX_ATTEMPTS")
        }
        other => panic!("expected override error, got {other:?}"),
    }
}
