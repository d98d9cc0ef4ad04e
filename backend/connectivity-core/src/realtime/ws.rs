//! WebSocket transport over `tokio-tungstenite`.
//!
//! Frames are JSON text messages `{"event": name, "data": payload}`. The
//! transport owns its reconnection loop: after an established connection
//! drops, or a reconnect attempt fails, it backs off exponentially and tries
//! again until `reconnection_attempts` is used up.

use crate::error::SocketError;
use crate::realtime::config::SocketConfig;
use crate::realtime::registry::ListenerRegistry;
use crate::realtime::transport::{
    EventHandler, ListenerId, SocketTransport, TransportFactory, events,
};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CLIENT_CLOSE_REASON: &str = "io client disconnect";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Creates one [`WsTransport`] per connect.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransportFactory;

impl TransportFactory for WsTransportFactory {
    fn create(&self, config: &SocketConfig) -> Result<Arc<dyn SocketTransport>, SocketError> {
        Ok(Arc::new(WsTransport::new(config.clone())?))
    }
}

struct WsShared {
    config: SocketConfig,
    listeners: ListenerRegistry,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    connected: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl WsShared {
    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Message>>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn dispatch(&self, event: &str, payload: Value) {
        let delivered = self.listeners.dispatch(event, &payload);
        debug!("Socket event '{event}' delivered to {delivered} handler(s)");
    }

    fn dispatch_frame(&self, text: &str) {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => self.dispatch(&envelope.event, envelope.data),
            Err(e) => warn!("Dropping malformed socket frame: {e}"),
        }
    }
}

/// A single WebSocket connection plus its reconnection loop.
pub struct WsTransport {
    shared: Arc<WsShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WsTransport {
    pub fn new(config: SocketConfig) -> Result<Self, SocketError> {
        if !config.url.starts_with("ws://") && !config.url.starts_with("wss://") {
            return Err(SocketError::Transport {
                message: format!("Invalid socket URL: {}", config.url),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            shared: Arc::new(WsShared {
                config,
                listeners: ListenerRegistry::new(),
                outbound: Mutex::new(None),
                connected: AtomicBool::new(false),
                shutdown,
            }),
            task: Mutex::new(None),
        })
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SocketTransport for WsTransport {
    fn open(&self) {
        if self.shared.is_shut_down() {
            warn!("open() called on a closed socket transport");
            return;
        }

        let mut task = self.task();
        if task.is_none() {
            *task = Some(tokio::spawn(run_connection_loop(Arc::clone(&self.shared))));
        }
    }

    fn close(&self) {
        let was_connected = self.shared.connected.swap(false, Ordering::SeqCst);
        self.shared.listeners.clear();
        self.shared.shutdown.send_replace(true);
        self.shared.outbound().take();

        if was_connected {
            info!("Closing socket connection to {}", self.shared.config.url);
        } else if let Some(task) = self.task().take() {
            // Nothing to close gracefully; stop the connect/backoff loop outright
            task.abort();
        }
    }

    fn on(&self, event: &str, id: ListenerId, handler: EventHandler) {
        self.shared.listeners.add(event, id, handler);
    }

    fn off(&self, event: &str, id: Option<ListenerId>) {
        self.shared.listeners.remove(event, id);
    }

    fn emit(&self, event: &str, data: Value) -> Result<(), SocketError> {
        let outbound = self.shared.outbound();
        let Some(sender) = outbound.as_ref() else {
            return Err(SocketError::Send {
                message: format!("Cannot emit '{event}': socket not connected"),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let frame = serde_json::to_string(&Envelope {
            event: event.to_string(),
            data,
        })?;

        sender
            .send(Message::text(frame))
            .map_err(|e| SocketError::Send {
                message: format!("Socket writer stopped: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        // The loop exits on its own once it sees the flag, closing gracefully if connected
        self.shared.shutdown.send_replace(true);
    }
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

fn reconnect_backoff(config: &SocketConfig) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: config.reconnection_delay(),
        max_interval: config.reconnection_delay_max(),
        multiplier: 2.0,
        randomization_factor: 0.5,
        max_elapsed_time: None,
        ..Default::default()
    }
}

async fn run_connection_loop(shared: Arc<WsShared>) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut backoff = reconnect_backoff(&shared.config);
    let mut reconnect_attempt: u32 = 0;

    loop {
        if shared.is_shut_down() {
            break;
        }

        let result = tokio::select! {
            result = connect_async(shared.config.url.as_str()) => result,
            _ = shutdown.changed() => break,
        };

        match result {
            Ok((stream, _response)) => {
                info!("Socket connected to {}", shared.config.url);
                let (sender, receiver) = mpsc::unbounded_channel();
                *shared.outbound() = Some(sender);
                shared.connected.store(true, Ordering::SeqCst);

                if reconnect_attempt > 0 {
                    shared.dispatch(events::RECONNECT, json!({ "attempt": reconnect_attempt }));
                }
                reconnect_attempt = 0;
                backoff.reset();
                shared.dispatch(events::CONNECT, Value::Null);

                let end = pump(stream, receiver, &shared, &mut shutdown).await;

                shared.connected.store(false, Ordering::SeqCst);
                shared.outbound().take();

                match end {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Lost(reason) => {
                        warn!("Socket connection lost: {reason}");
                        shared.dispatch(events::DISCONNECT, json!({ "reason": reason }));
                    }
                }
            }
            Err(e) => {
                debug!("Socket connect to {} failed: {e}", shared.config.url);
                shared.dispatch(events::CONNECT_ERROR, json!({ "message": e.to_string() }));
            }
        }

        if !shared.config.reconnection || shared.is_shut_down() {
            break;
        }

        reconnect_attempt += 1;
        if reconnect_attempt > shared.config.reconnection_attempts {
            warn!(
                "Socket gave up after {} reconnect attempts",
                shared.config.reconnection_attempts
            );
            shared.dispatch(events::RECONNECT_FAILED, Value::Null);
            break;
        }

        let Some(delay) = backoff.next_backoff() else {
            shared.dispatch(events::RECONNECT_FAILED, Value::Null);
            break;
        };

        tokio::select! {
            _ = sleep(delay) => {}
            _ = shutdown.changed() => break,
        }

        shared.dispatch(
            events::RECONNECT_ATTEMPT,
            json!({ "attempt": reconnect_attempt }),
        );
    }

    shared.connected.store(false, Ordering::SeqCst);
    debug!("Socket connection loop for {} stopped", shared.config.url);
}

/// Shuttle frames until the connection ends or shutdown is requested.
async fn pump(
    stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    shared: &WsShared,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                let _ = write.close().await;
                debug!("Socket closed by client: {CLIENT_CLOSE_REASON}");
                return SessionEnd::Shutdown;
            }
            Some(message) = outbound.recv() => {
                if let Err(e) = write.send(message).await {
                    return SessionEnd::Lost(format!("send failed: {e}"));
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => shared.dispatch_frame(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "io server disconnect".to_string());
                    return SessionEnd::Lost(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                None => return SessionEnd::Lost("transport close".to_string()),
            }
        }
    }
}
