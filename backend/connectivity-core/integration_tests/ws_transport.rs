use crate::helpers::{TestSocketServer, refused_socket_url, socket_config, wait_until};

use connectivity_core::error::SocketError;
use connectivity_core::realtime::{ListenerId, SocketTransport, WsTransport, events};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

const LIMIT: Duration = Duration::from_secs(3);

fn counter(transport: &WsTransport, event: &str) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let sink = count.clone();
    transport.on(
        event,
        ListenerId::new(),
        Arc::new(move |_: &Value| {
            sink.fetch_add(1, Ordering::SeqCst);
        }),
    );
    count
}

/// **VALUE**: Verifies frames flow both ways in the JSON envelope.
///
/// **WHY THIS MATTERS**: The envelope is the wire contract with the socket server.
///
/// **BUG THIS CATCHES**: Would catch events being sent without the `event`/`data` wrapper.
#[tokio::test]
async fn given_running_server_when_opened_then_connects_and_exchanges_events() {
    // GIVEN: A server and a transport with a handler for a pushed event
    let server = TestSocketServer::start().await;
    let transport = WsTransport::new(socket_config(&server.url)).unwrap();
    let connects = counter(&transport, events::CONNECT);
    let pushed = Arc::new(Mutex::new(Vec::new()));
    let sink = pushed.clone();
    transport.on(
        "post:created",
        ListenerId::new(),
        Arc::new(move |payload: &Value| sink.lock().unwrap().push(payload.clone())),
    );

    // WHEN: Opening
    transport.open();

    // THEN: Connected once
    assert!(wait_until(LIMIT, || transport.is_connected()).await);
    assert_eq!(connects.load(Ordering::SeqCst), 1);

    // WHEN: Emitting, and the server pushing
    transport.emit("typing", json!({ "conversationId": 5 })).unwrap();
    assert!(wait_until(LIMIT, || server.received_count("typing") == 1).await);
    server.push("post:created", json!({ "postId": 11 }));

    // THEN: Both directions delivered
    assert_eq!(server.received()[0].1, json!({ "conversationId": 5 }));
    assert!(wait_until(LIMIT, || pushed.lock().unwrap().len() == 1).await);
    assert_eq!(pushed.lock().unwrap()[0], json!({ "postId": 11 }));

    transport.close();
    assert!(!transport.is_connected());
}

/// **VALUE**: Verifies a server-side drop triggers automatic reconnection.
///
/// **WHY THIS MATTERS**: Deploys and load balancer timeouts drop sockets routinely.
///
/// **BUG THIS CATCHES**: Would catch the loop exiting on the first lost connection.
#[tokio::test]
async fn given_connected_when_server_drops_connection_then_reconnects() {
    // GIVEN: A connected transport
    let server = TestSocketServer::start().await;
    let transport = WsTransport::new(socket_config(&server.url)).unwrap();
    let connects = counter(&transport, events::CONNECT);
    let disconnects = counter(&transport, events::DISCONNECT);
    let attempts = counter(&transport, events::RECONNECT_ATTEMPT);
    let reconnects = counter(&transport, events::RECONNECT);
    transport.open();
    assert!(wait_until(LIMIT, || transport.is_connected()).await);

    // WHEN: The server kicks every client
    server.kick();

    // THEN: Lost, retried, and back
    assert!(wait_until(LIMIT, || connects.load(Ordering::SeqCst) == 2).await);
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert!(attempts.load(Ordering::SeqCst) >= 1);
    assert_eq!(reconnects.load(Ordering::SeqCst), 1);
    assert_eq!(server.connections(), 2);

    transport.close();
}

/// **VALUE**: Verifies a refused first attempt is reported without reconnection when disabled.
#[tokio::test]
async fn given_nothing_listening_when_opened_without_reconnection_then_single_connect_error() {
    // GIVEN: A closed port and reconnection off
    let mut config = socket_config(&refused_socket_url().await);
    config.reconnection = false;
    let transport = WsTransport::new(config).unwrap();
    let errors = counter(&transport, events::CONNECT_ERROR);
    let attempts = counter(&transport, events::RECONNECT_ATTEMPT);

    // WHEN
    transport.open();

    // THEN
    assert!(wait_until(LIMIT, || errors.load(Ordering::SeqCst) == 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
    assert!(!transport.is_connected());
}

/// **VALUE**: Verifies reconnection is bounded and ends with `reconnect_failed`.
///
/// **BUG THIS CATCHES**: Would catch an unbounded retry loop hammering a dead server.
#[tokio::test]
async fn given_nothing_listening_when_reconnecting_then_gives_up_after_configured_attempts() {
    // GIVEN: A closed port and two allowed reconnects
    let mut config = socket_config(&refused_socket_url().await);
    config.reconnection_attempts = 2;
    let transport = WsTransport::new(config).unwrap();
    let attempts = counter(&transport, events::RECONNECT_ATTEMPT);
    let failed = counter(&transport, events::RECONNECT_FAILED);

    // WHEN
    transport.open();

    // THEN
    assert!(wait_until(LIMIT, || failed.load(Ordering::SeqCst) == 1).await);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

/// **VALUE**: Verifies emit before connect fails instead of queueing.
#[tokio::test]
async fn given_not_connected_when_emitting_then_send_error() {
    let transport = WsTransport::new(socket_config(&refused_socket_url().await)).unwrap();

    let result = transport.emit("typing", json!({}));

    assert!(matches!(result, Err(SocketError::Send { .. })));
}

/// **VALUE**: Verifies non-WebSocket URLs are rejected up front.
#[test]
fn given_http_url_when_creating_transport_then_rejected() {
    let result = WsTransport::new(socket_config("http://127.0.0.1:1/socket"));

    assert!(matches!(result, Err(SocketError::Transport { .. })));
}
