use crate::helpers::{
    TEST_SOCKET_TOKEN, TestSocketServer, refused_socket_url, socket_config, wait_until, within,
};

use common::RedactedToken;
use connectivity_core::auth::{AnonymousProvider, AuthSignals, StaticTokenProvider};
use connectivity_core::error::SocketError;
use connectivity_core::realtime::{SocketManager, TransportFactory, WsTransportFactory};
use models::{AuthSignal, ConnectionState};

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

const LIMIT: Duration = Duration::from_secs(3);

fn manager(url: &str, token: Option<&str>) -> SocketManager {
    let factory: Option<Arc<dyn TransportFactory>> = Some(Arc::new(WsTransportFactory));
    match token {
        Some(token) => SocketManager::new(
            socket_config(url),
            factory,
            Arc::new(StaticTokenProvider::new(RedactedToken::new(token))),
        ),
        None => SocketManager::new(socket_config(url), factory, Arc::new(AnonymousProvider)),
    }
}

/// **VALUE**: Verifies the full connect + authenticate handshake over a real socket.
#[tokio::test]
async fn given_valid_token_when_connecting_then_authenticated_and_emits_reach_server() {
    // GIVEN
    let server = TestSocketServer::start().await;
    let manager = manager(&server.url, Some(TEST_SOCKET_TOKEN));

    // WHEN
    within(manager.connect()).await.unwrap();

    // THEN: Handshake carried the token; emits flow
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.has_token());
    let authenticate = server
        .received()
        .into_iter()
        .find(|(event, _)| event == "authenticate")
        .unwrap();
    assert_eq!(authenticate.1, json!({ "token": TEST_SOCKET_TOKEN }));

    assert!(manager.emit("typing", json!({ "conversationId": 1 })));
    assert!(wait_until(LIMIT, || server.received_count("typing") == 1).await);

    manager.disconnect();
}

/// **VALUE**: Verifies a rejected token fails connect and closes the socket.
#[tokio::test]
async fn given_invalid_token_when_connecting_then_handshake_error() {
    // GIVEN
    let server = TestSocketServer::start().await;
    let manager = manager(&server.url, Some("wrong-token"));

    // WHEN
    let result = within(manager.connect()).await;

    // THEN
    assert!(matches!(result, Err(SocketError::AuthHandshake { .. })));
    assert_eq!(manager.state(), ConnectionState::Error);
    assert!(!manager.emit("typing", json!({})));
}

/// **VALUE**: Verifies guests connect without a handshake.
#[tokio::test]
async fn given_no_token_when_connecting_then_guest_without_handshake() {
    let server = TestSocketServer::start().await;
    let manager = manager(&server.url, None);

    within(manager.connect()).await.unwrap();

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(server.received_count("authenticate"), 0);
    manager.disconnect();
}

/// **VALUE**: Verifies an unreachable server fails the initial connect.
#[tokio::test]
async fn given_no_server_when_connecting_then_transport_error() {
    let manager = manager(&refused_socket_url().await, None);

    let result = within(manager.connect()).await;

    assert!(matches!(result, Err(SocketError::Transport { .. })));
    assert_eq!(manager.state(), ConnectionState::Error);
}

/// **VALUE**: Verifies recovery after a server-side drop re-authenticates on the new connection.
///
/// **WHY THIS MATTERS**: The server forgets the session when the socket drops.
///
/// **BUG THIS CATCHES**: Would catch the recovered socket staying anonymous.
#[tokio::test]
async fn given_authenticated_when_server_drops_connection_then_reconnects_and_reauthenticates() {
    // GIVEN: An authenticated manager
    let server = TestSocketServer::start().await;
    let manager = manager(&server.url, Some(TEST_SOCKET_TOKEN));
    within(manager.connect()).await.unwrap();

    // WHEN: The server kicks the client
    server.kick();

    // THEN: Back to Connected on a second connection with a second handshake
    assert!(wait_until(LIMIT, || server.received_count("authenticate") == 2).await);
    assert!(wait_until(LIMIT, || manager.is_connected()).await);
    assert_eq!(server.connections(), 2);

    manager.disconnect();
}

/// **VALUE**: Verifies logout then login produces exactly one new connection.
#[tokio::test]
async fn given_auth_bus_when_logout_then_login_then_one_fresh_connection() {
    // GIVEN: A connected manager following the auth bus
    let server = TestSocketServer::start().await;
    let manager = manager(&server.url, Some(TEST_SOCKET_TOKEN));
    within(manager.connect()).await.unwrap();
    let signals = AuthSignals::new();
    let _listener = manager.listen_for_auth_signals(&signals);

    // WHEN: Logout
    signals.publish(AuthSignal::Logout);
    assert!(wait_until(LIMIT, || manager.state() == ConnectionState::Disconnected).await);

    // WHEN: Login
    signals.publish(AuthSignal::Login);
    assert!(wait_until(LIMIT, || manager.is_connected()).await);

    // THEN: Two connections total, each authenticated once
    assert!(wait_until(LIMIT, || server.received_count("authenticate") == 2).await);
    assert_eq!(server.connections(), 2);

    manager.disconnect();
}
