//! Test helpers for connectivity integration tests.
//!
//! - Config builders pointing at local servers with short delays
//! - An in-process WebSocket server speaking the `{"event", "data"}` envelope
//! - Polling and recording utilities

use connectivity_core::NetworkConfig;
use connectivity_core::bridge::{CacheUpdater, QueryCache};
use connectivity_core::realtime::SocketConfig;

use models::CacheKey;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Token the test server accepts in the authenticate handshake.
pub const TEST_SOCKET_TOKEN: &str = "test-socket-token-12345";

/// Network config for a wiremock server with millisecond retry delays.
pub fn http_config(server_uri: &str) -> NetworkConfig {
    let mut config = NetworkConfig::default();
    config.http.base_url = format!("{server_uri}/api/");
    config.retry.initial_delay_ms = 10;
    config.retry.max_delay_ms = 40;
    config
}

pub fn socket_config(url: &str) -> SocketConfig {
    SocketConfig {
        url: url.to_string(),
        connect_timeout_ms: 2_000,
        auth_timeout_ms: 1_000,
        reconnection: true,
        reconnection_attempts: 3,
        reconnection_delay_ms: 10,
        reconnection_delay_max_ms: 40,
        ..SocketConfig::default()
    }
}

/// A `ws://` URL nothing listens on.
pub async fn refused_socket_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{address}")
}

/// Poll `condition` every 10ms until it holds or `limit` passes.
pub async fn wait_until<F>(limit: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let polled = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(limit, polled).await.is_ok()
}

/// Await `future` with a generous limit so a hang fails the test instead of stalling it.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation timed out")
}

fn frame(event: &str, data: Value) -> Message {
    Message::text(json!({ "event": event, "data": data }).to_string())
}

#[derive(Debug, Clone)]
enum ServerCommand {
    Push(String),
    Kick,
}

/// Minimal socket server: answers `authenticate`, records every frame,
/// and lets the test push events or drop every connection.
pub struct TestSocketServer {
    pub url: String,
    commands: broadcast::Sender<ServerCommand>,
    received: Arc<Mutex<Vec<(String, Value)>>>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TestSocketServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (commands, _) = broadcast::channel(32);
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task = {
            let commands = commands.clone();
            let received = received.clone();
            let connections = connections.clone();

            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let mut inbox = commands.subscribe();
                    let received = received.clone();
                    let connections = connections.clone();

                    tokio::spawn(async move {
                        let Ok(socket) = accept_async(stream).await else {
                            return;
                        };
                        connections.fetch_add(1, Ordering::SeqCst);
                        let (mut write, mut read) = socket.split();

                        loop {
                            tokio::select! {
                                incoming = read.next() => match incoming {
                                    Some(Ok(Message::Text(text))) => {
                                        let envelope: Value = serde_json::from_str(text.as_str()).unwrap();
                                        let event = envelope["event"].as_str().unwrap_or_default().to_string();
                                        let data = envelope["data"].clone();
                                        received.lock().unwrap().push((event.clone(), data.clone()));

                                        if event == "authenticate" {
                                            let reply = if data["token"] == TEST_SOCKET_TOKEN {
                                                frame("authenticated", json!({}))
                                            } else {
                                                frame("unauthorized", json!({ "message": "invalid token" }))
                                            };
                                            if write.send(reply).await.is_err() {
                                                break;
                                            }
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                    Some(Ok(_)) => {}
                                },
                                command = inbox.recv() => match command {
                                    Ok(ServerCommand::Push(text)) => {
                                        if write.send(Message::text(text)).await.is_err() {
                                            break;
                                        }
                                    }
                                    Ok(ServerCommand::Kick) => {
                                        let _ = write.send(Message::Close(None)).await;
                                        break;
                                    }
                                    Err(_) => break,
                                },
                            }
                        }
                    });
                }
            })
        };

        Self {
            url,
            commands,
            received,
            connections,
            task,
        }
    }

    /// Send an event to every connected client.
    pub fn push(&self, event: &str, data: Value) {
        let text = json!({ "event": event, "data": data }).to_string();
        let _ = self.commands.send(ServerCommand::Push(text));
    }

    /// Close every open connection from the server side.
    pub fn kick(&self) {
        let _ = self.commands.send(ServerCommand::Kick);
    }

    pub fn received(&self) -> Vec<(String, Value)> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_count(&self, event: &str) -> usize {
        self.received().iter().filter(|(name, _)| name == event).count()
    }

    /// Completed WebSocket handshakes so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for TestSocketServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Cache collaborator that records what it was asked to do.
#[derive(Default)]
pub struct RecordingCache {
    calls: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl QueryCache for RecordingCache {
    fn invalidate(&self, key: &CacheKey) {
        self.calls.lock().unwrap().push(format!("invalidate {key}"));
    }

    fn refetch(&self, key: &CacheKey) {
        self.calls.lock().unwrap().push(format!("refetch {key}"));
    }

    fn set_data(&self, key: &CacheKey, updater: CacheUpdater) {
        let next = updater(None);
        self.calls
            .lock()
            .unwrap()
            .push(format!("set {key} {}", next.unwrap_or(Value::Null)));
    }
}
