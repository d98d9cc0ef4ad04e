use crate::error::HttpError;
use crate::retry::{
    RequestAttempt, RetryConfig, attempts_allowed, is_retryable, next_delay, should_retry,
};

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

fn network_error() -> HttpError {
    HttpError::Network {
        message: "connection refused".to_string(),
        timed_out: false,
        location: ErrorLocation::from(Location::caller()),
    }
}

fn not_found() -> HttpError {
    HttpError::NotFound {
        message: "Not Found".to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// **VALUE**: Verifies the default delay sequence.
///
/// **WHY THIS MATTERS**: Backoff timing is user-visible latency; it must double and then cap.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one exponent (2000 first) or a missing cap.
#[test]
fn given_defaults_when_computing_delays_then_doubles_until_capped() {
    // GIVEN: Default config (1s initial, x2, 10s cap)
    let config = RetryConfig::default();

    // WHEN: Computing delays for attempts 1..=6
    let delays: Vec<u64> = (1..=6)
        .map(|attempt| next_delay(attempt, &config).as_millis() as u64)
        .collect();

    // THEN: 1000, 2000, 4000, 8000, then capped at 10000
    assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 10_000, 10_000]);
}

/// **VALUE**: Verifies delays never decrease and never exceed the cap.
///
/// **BUG THIS CATCHES**: Would catch float overflow turning huge attempts into tiny delays.
#[test]
fn given_many_attempts_when_computing_delays_then_monotone_and_capped() {
    // GIVEN: A config with a non-integer multiplier
    let config = RetryConfig {
        initial_delay_ms: 250,
        max_delay_ms: 7_000,
        backoff_multiplier: 1.7,
        ..RetryConfig::default()
    };

    // WHEN / THEN: Walk far past the cap
    let mut previous = Duration::ZERO;
    for attempt in 1..200 {
        let delay = next_delay(attempt, &config);
        assert!(delay >= previous, "attempt {attempt} went backwards");
        assert!(delay <= Duration::from_millis(7_000));
        previous = delay;
    }
    assert_eq!(next_delay(u32::MAX, &config), Duration::from_millis(7_000));
}

/// **VALUE**: Verifies a status is retryable iff retries are enabled and it is in the set.
///
/// **WHY THIS MATTERS**: Disabling retries must turn every status into a final answer.
///
/// **BUG THIS CATCHES**: Would catch `enabled` being ignored by the status check.
#[test]
fn given_status_codes_when_checking_retryable_then_requires_enabled_and_membership() {
    // GIVEN: Enabled and disabled configs
    let enabled = RetryConfig::default();
    let disabled = RetryConfig {
        enabled: false,
        ..RetryConfig::default()
    };

    // THEN: Default set
    for status in [408, 429, 500, 502, 503, 504] {
        assert!(is_retryable(status, &enabled), "{status}");
        assert!(!is_retryable(status, &disabled), "{status}");
    }
    for status in [200, 400, 401, 403, 404, 422] {
        assert!(!is_retryable(status, &enabled), "{status}");
    }
}

/// **VALUE**: Verifies network failures follow `retry_on_network_error`.
#[test]
fn given_network_error_when_deciding_then_follows_network_flag() {
    // GIVEN: Configs with the flag on and off
    let on = RetryConfig::default();
    let off = RetryConfig {
        retry_on_network_error: false,
        ..RetryConfig::default()
    };

    // THEN
    assert!(should_retry(&network_error(), &on));
    assert!(!should_retry(&network_error(), &off));
    assert!(!should_retry(&not_found(), &on));
}

/// **VALUE**: Verifies the attempt budget.
#[test]
fn given_configs_when_counting_attempts_then_disabled_means_one() {
    assert_eq!(attempts_allowed(&RetryConfig::default()), 3);
    assert_eq!(
        attempts_allowed(&RetryConfig {
            enabled: false,
            ..RetryConfig::default()
        }),
        1
    );
    assert_eq!(
        attempts_allowed(&RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        }),
        1
    );
}

/// **VALUE**: Verifies the attempt record renders the error code, not the full message.
#[test]
fn given_failed_attempt_when_displayed_then_includes_number_and_code() {
    // GIVEN: A failed attempt
    let attempt = RequestAttempt::failed(2, Duration::from_millis(15), not_found());

    // WHEN
    let rendered = attempt.to_string();

    // THEN
    assert!(rendered.contains("attempt 2 failed"));
    assert!(rendered.contains("NOT_FOUND"));
    assert!(attempt.into_error().is_some());
}
