use netprobe::app::Netprobe;
use netprobe::error::AppError;
use netprobe::settings::Settings;

use connectivity_core::NetworkConfig;

use models::{ConnectionState, NetworkStatus};

use std::future::ready;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::timeout;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> Settings {
    Settings {
        config_path: PathBuf::from("netprobe.toml"),
        log_dir: PathBuf::from("."),
        session_token: None,
        socket_token: None,
        health_endpoint: String::from("health"),
        poll_interval: Duration::from_millis(50),
    }
}

async fn config_for(server: &MockServer) -> NetworkConfig {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let refused = format!("ws://{}/socket", listener.local_addr().unwrap());
    drop(listener);

    let mut config = NetworkConfig::default();
    config.http.base_url = format!("{}/api/", server.uri());
    config.retry.enabled = false;
    config.socket.url = refused;
    config.socket.reconnection = false;
    config
}

/// **VALUE**: Verifies the wired-up probe reaches the backend and reports online.
///
/// **WHY THIS MATTERS**: The probe is the only thing feeding the tracker in this binary.
///
/// **BUG THIS CATCHES**: Would catch the probe using a client that is not shared with the tracker.
#[tokio::test]
async fn given_healthy_backend_when_probing_then_returns_body_and_stays_online() {
    // GIVEN: A backend with a healthy endpoint
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;
    let app = Netprobe::build(&config_for(&server).await, &settings()).unwrap();

    // WHEN
    let body = app.probe().check().await.unwrap();

    // THEN
    assert_eq!(body, json!({ "status": "ok" }));
    assert_eq!(app.tracker.status(), NetworkStatus::Online);
}

/// **VALUE**: Verifies repeated failed probes degrade the shared tracker.
///
/// **BUG THIS CATCHES**: Would catch the app building a second tracker for its own subscriptions.
#[tokio::test]
async fn given_failing_backend_when_probing_three_times_then_degraded() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let app = Netprobe::build(&config_for(&server).await, &settings()).unwrap();

    // WHEN
    for _ in 0..3 {
        assert!(app.probe().check().await.is_err());
    }

    // THEN
    assert_eq!(app.tracker.status(), NetworkStatus::Degraded);
}

/// **VALUE**: Verifies the session token from the environment is attached to probes.
#[tokio::test]
async fn given_session_token_when_probing_then_sends_bearer() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .and(header("authorization", "Bearer session-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let settings = Settings {
        session_token: Some(String::from("session-abc")),
        ..settings()
    };
    let app = Netprobe::build(&config_for(&server).await, &settings).unwrap();

    // WHEN
    let result = app.probe().check().await;

    // THEN
    assert!(result.is_ok());
}

/// **VALUE**: Verifies a malformed token endpoint stops start-up with a core error.
///
/// **BUG THIS CATCHES**: Would catch the endpoint error being swallowed into an anonymous socket.
#[tokio::test]
async fn given_malformed_token_endpoint_when_building_then_core_error() {
    // GIVEN
    let server = MockServer::start().await;
    let mut config = config_for(&server).await;
    config.socket.token_endpoint = Some(String::from("not a url"));

    // WHEN
    let result = Netprobe::build(&config, &settings());

    // THEN
    assert!(matches!(result, Err(AppError::Core(_))));
}

/// **VALUE**: Verifies `run` survives an unreachable socket and returns on shutdown.
///
/// **WHY THIS MATTERS**: The socket is optional for health reporting; a dead socket server
/// must not keep the binary from starting or from exiting on Ctrl+C.
///
/// **BUG THIS CATCHES**: Would catch a connect error being propagated out of `run`, or the poll
/// loop ignoring the shutdown future.
#[tokio::test]
async fn given_unreachable_socket_when_running_then_probes_and_shuts_down() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    let app = Netprobe::build(&config_for(&server).await, &settings()).unwrap();
    let manager = app.manager.clone();
    let tracker = app.tracker.clone();

    // WHEN: Shutdown is already requested
    let finished = timeout(Duration::from_secs(5), app.run(ready(()))).await;

    // THEN
    assert!(finished.is_ok(), "run should return once shutdown resolves");
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(tracker.status(), NetworkStatus::Online);
}
