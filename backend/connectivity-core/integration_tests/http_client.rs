use crate::helpers::http_config;

use common::RedactedToken;
use connectivity_core::auth::StaticTokenProvider;
use connectivity_core::degraded::{DegradedModeConfig, DegradedModeTracker};
use connectivity_core::error::HttpError;
use connectivity_core::http::{HttpClient, RequestOptions};
use models::NetworkStatus;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

async fn client_for(server: &MockServer) -> (HttpClient, DegradedModeTracker) {
    let tracker = DegradedModeTracker::new(DegradedModeConfig::default());
    let client = HttpClient::new(&http_config(&server.uri()), tracker.clone()).unwrap();
    (client, tracker)
}

/// **VALUE**: Verifies a persistently unavailable backend is tried exactly three times.
///
/// **WHY THIS MATTERS**: Retries absorb blips, but each logical call must count once
/// toward degraded mode, or three slow calls would flip the banner after one.
///
/// **BUG THIS CATCHES**: Would catch per-attempt failure recording or an extra attempt.
#[tokio::test]
async fn given_503_every_time_when_requesting_then_three_attempts_and_one_failure_recorded() {
    // GIVEN: A backend that always answers 503
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    let (client, tracker) = client_for(&server).await;

    // WHEN
    let result = client.get::<Value>("feed").await;

    // THEN: Final error is the 503, tracker heard about it once
    let error = result.unwrap_err();
    assert!(matches!(error, HttpError::Request { status: 503, .. }));
    assert_eq!(tracker.consecutive_failures(), 1);
    assert_eq!(tracker.status(), NetworkStatus::Online);
}

/// Answers 503 and records when each request arrived.
#[derive(Clone, Default)]
struct TimedUnavailable {
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for TimedUnavailable {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(503)
    }
}

/// **VALUE**: Verifies consecutive attempts are spaced by the backoff delays (10ms, then 20ms).
///
/// **WHY THIS MATTERS**: Back-to-back retries hammer a backend that is already struggling.
///
/// **BUG THIS CATCHES**: Would catch the inter-attempt sleep being skipped or using the wrong attempt number.
#[tokio::test]
async fn given_503_every_time_when_requesting_then_attempts_spaced_by_backoff() {
    // GIVEN: A backend that always answers 503 and timestamps each hit
    let server = MockServer::start().await;
    let responder = TimedUnavailable::default();
    let arrivals = Arc::clone(&responder.arrivals);
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(responder)
        .expect(3)
        .mount(&server)
        .await;
    let (client, _tracker) = client_for(&server).await;

    // WHEN
    let started = Instant::now();
    let result = client.get::<Value>("feed").await;
    let elapsed = started.elapsed();

    // THEN: Gaps follow 10ms * 2^(n-1)
    assert!(result.is_err());
    let arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 3);
    assert!(arrivals[1] - arrivals[0] >= Duration::from_millis(10));
    assert!(arrivals[2] - arrivals[1] >= Duration::from_millis(20));
    assert!(elapsed >= Duration::from_millis(30));
}

/// **VALUE**: Verifies 404 is final on the first attempt.
///
/// **BUG THIS CATCHES**: Would catch non-retryable statuses being retried.
#[tokio::test]
async fn given_404_when_requesting_then_single_attempt_not_found() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "No such post" })))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _tracker) = client_for(&server).await;

    // WHEN
    let error = client.get::<Value>("/posts/99").await.unwrap_err();

    // THEN
    assert!(matches!(error, HttpError::NotFound { .. }));
    assert_eq!(error.message(), "No such post");
}

/// **VALUE**: Verifies a transient failure followed by success returns the success.
#[tokio::test]
async fn given_one_503_then_200_when_requesting_then_success_and_tracker_clean() {
    // GIVEN: One 503, then a healthy answer
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [1, 2] })))
        .mount(&server)
        .await;
    let (client, tracker) = client_for(&server).await;

    // WHEN
    let response = client.get::<Value>("feed").await.unwrap();

    // THEN
    assert_eq!(response.status, 200);
    assert_eq!(response.data, json!({ "items": [1, 2] }));
    assert_eq!(tracker.consecutive_failures(), 0);
}

/// **VALUE**: Verifies validation details reach the caller.
#[tokio::test]
async fn given_422_when_posting_then_validation_error_with_details() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Invalid input",
            "errors": { "email": ["is invalid"] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _tracker) = client_for(&server).await;

    // WHEN
    let error = client
        .post::<_, Value>("users", &json!({ "email": "nope" }))
        .await
        .unwrap_err();

    // THEN
    match error {
        HttpError::Validation { details, .. } => {
            assert_eq!(details, Some(json!({ "email": ["is invalid"] })))
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies a slow response loses the race against the timeout.
///
/// **WHY THIS MATTERS**: A hung backend must not hang the UI past the configured budget.
///
/// **BUG THIS CATCHES**: Would catch the timeout covering only headers, not the body.
#[tokio::test]
async fn given_slow_backend_when_timeout_elapses_then_network_timeout_error() {
    // GIVEN: A response delayed well past the per-request timeout
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    let (client, tracker) = client_for(&server).await;

    // WHEN
    let options = RequestOptions::get()
        .with_timeout(Duration::from_millis(50))
        .without_retry();
    let error = client.request::<Value>("slow", options).await.unwrap_err();

    // THEN
    assert!(error.is_network());
    assert!(error.is_timeout());
    assert_eq!(error.status(), None);
    assert_eq!(tracker.consecutive_failures(), 1);
}

/// **VALUE**: Verifies the session token and request id are attached.
#[tokio::test]
async fn given_session_when_requesting_then_bearer_and_request_id_sent() {
    // GIVEN: A backend that only answers authenticated calls
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer session-abc"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    let (client, _tracker) = client_for(&server).await;
    let client = client.with_session_provider(Arc::new(StaticTokenProvider::new(
        RedactedToken::new("session-abc"),
    )));

    // WHEN / THEN
    let response = client.get::<Value>("me").await.unwrap();
    assert_eq!(response.data["id"], 1);
}

/// **VALUE**: Verifies `skip_auth` keeps the token off public endpoints.
#[tokio::test]
async fn given_skip_auth_when_requesting_then_no_authorization_header() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/public"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let (client, _tracker) = client_for(&server).await;
    let client = client.with_session_provider(Arc::new(StaticTokenProvider::new(
        RedactedToken::new("session-abc"),
    )));

    // WHEN
    let response = client
        .request::<()>("public", RequestOptions::get().skip_auth())
        .await
        .unwrap();

    // THEN
    assert_eq!(response.status, 204);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

/// **VALUE**: Verifies three failing calls in a row degrade, and one success recovers.
#[tokio::test]
async fn given_three_failed_calls_when_then_succeeding_then_degraded_then_online() {
    // GIVEN: A failing endpoint and a healthy one
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;
    let (client, tracker) = client_for(&server).await;
    let no_retry = || RequestOptions::get().without_retry();

    // WHEN: Three failing calls
    for _ in 0..3 {
        let _ = client.request::<Value>("broken", no_retry()).await;
    }

    // THEN
    assert_eq!(tracker.status(), NetworkStatus::Degraded);

    // WHEN: One healthy call
    client.get::<Value>("health").await.unwrap();

    // THEN
    assert_eq!(tracker.status(), NetworkStatus::Online);
}

/// **VALUE**: Verifies an unreachable backend surfaces as a network error after retries.
#[tokio::test]
async fn given_unreachable_backend_when_requesting_then_network_error() {
    // GIVEN: A server that was shut down
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let tracker = DegradedModeTracker::new(DegradedModeConfig::default());
    let client = HttpClient::new(&http_config(&uri), tracker.clone()).unwrap();

    // WHEN
    let error = client.get::<Value>("anything").await.unwrap_err();

    // THEN
    assert!(error.is_network());
    assert!(!error.is_timeout());
    assert_eq!(tracker.consecutive_failures(), 1);
}
