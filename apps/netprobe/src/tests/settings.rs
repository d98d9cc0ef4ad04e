use crate::settings::Settings;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// **VALUE**: Verifies defaults when nothing is set.
#[test]
fn given_empty_environment_when_reading_settings_then_defaults() {
    let settings = Settings::from_lookup(|_| None);

    assert_eq!(settings.config_path, PathBuf::from("netprobe.toml"));
    assert_eq!(settings.log_dir, PathBuf::from("."));
    assert_eq!(settings.session_token, None);
    assert_eq!(settings.socket_token, None);
    assert_eq!(settings.health_endpoint, "health");
    assert_eq!(settings.poll_interval, Duration::from_secs(15));
}

/// **VALUE**: Verifies blank and malformed values fall back instead of half-applying.
///
/// **BUG THIS CATCHES**: Would catch `NETPROBE_SOCKET_TOKEN=` being sent as an empty token.
#[test]
fn given_blank_or_malformed_values_when_reading_settings_then_ignored() {
    // GIVEN
    let env: HashMap<&str, &str> = HashMap::from([
        ("NETPROBE_SOCKET_TOKEN", "   "),
        ("NETPROBE_POLL_INTERVAL_MS", "soon"),
        ("NETPROBE_CONFIG", "/etc/netprobe/network.toml"),
        ("NETPROBE_SESSION_TOKEN", "session-xyz"),
    ]);

    // WHEN
    let settings = Settings::from_lookup(|name| env.get(name).map(|value| value.to_string()));

    // THEN
    assert_eq!(settings.socket_token, None);
    assert_eq!(settings.poll_interval, Duration::from_secs(15));
    assert_eq!(settings.config_path, PathBuf::from("/etc/netprobe/network.toml"));
    assert_eq!(settings.session_token.as_deref(), Some("session-xyz"));
}
