//! Socket connection manager.
//!
//! # State machine
//!
//! ```text
//! Disconnected --connect()--> Connecting --connect event--> Connected
//! Connected --handshake failure--> Error
//! Connected --disconnect event--> Disconnected
//! Connected/Disconnected --reconnect_attempt--> Reconnecting --connect event--> Connected
//! Reconnecting --reconnect_failed--> Error
//! ```
//!
//! # Invariants
//!
//! - At most one transport exists at a time. Creating a new one always closes
//!   and disposes the previous one first.
//! - Handlers registered through [`SocketManager::on`] are owned by the
//!   manager and replayed onto every new transport.
//! - `disconnect()` cancels an in-flight `connect()`: every disposal bumps a
//!   generation counter, and a connect that sees the counter move gives up
//!   without touching state. Events from a disposed transport are ignored.

use crate::auth::{AuthSignals, SocketTokenProvider};
use crate::error::SocketError;
use crate::observability::Telemetry;
use crate::realtime::config::SocketConfig;
use crate::realtime::transport::{
    EventHandler, ListenerId, SocketTransport, TransportFactory, events,
};
use crate::subscribers::{Subscribers, Subscription};

use common::{ErrorLocation, RedactedToken};
use models::{AuthSignal, ConnectionState};

use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

struct Registration {
    event: String,
    id: ListenerId,
    handler: EventHandler,
}

struct ManagerInner {
    state: ConnectionState,
    transport: Option<Arc<dyn SocketTransport>>,
    token: Option<RedactedToken>,
}

struct ManagerShared {
    config: SocketConfig,
    factory: Option<Arc<dyn TransportFactory>>,
    token_provider: Arc<dyn SocketTokenProvider>,
    telemetry: Telemetry,
    inner: Mutex<ManagerInner>,
    registrations: Mutex<Vec<Registration>>,
    subscribers: Arc<Subscribers<ConnectionState>>,
    connect_lock: AsyncMutex<()>,
    generation: watch::Sender<u64>,
}

enum ConnectOutcome {
    Connected,
    Failed(String),
}

enum HandshakeOutcome {
    Accepted,
    Rejected(String),
}

/// Owner of the one live socket.
///
/// `Clone` is cheap and every clone drives the same connection, so the
/// application builds one at start-up and hands clones around.
#[derive(Clone)]
pub struct SocketManager {
    shared: Arc<ManagerShared>,
}

impl SocketManager {
    /// Build a manager.
    ///
    /// `factory` is the capability to open sockets at all. Pass `None` in
    /// contexts that must never hold a live connection; `connect()` then
    /// fails with [`SocketError::Unavailable`].
    pub fn new(
        config: SocketConfig,
        factory: Option<Arc<dyn TransportFactory>>,
        token_provider: Arc<dyn SocketTokenProvider>,
    ) -> Self {
        let (generation, _) = watch::channel(0);

        Self {
            shared: Arc::new(ManagerShared {
                config,
                factory,
                token_provider,
                telemetry: Telemetry::default(),
                inner: Mutex::new(ManagerInner {
                    state: ConnectionState::Disconnected,
                    transport: None,
                    token: None,
                }),
                registrations: Mutex::new(Vec::new()),
                subscribers: Subscribers::new(),
                connect_lock: AsyncMutex::new(()),
                generation,
            }),
        }
    }

    /// Replace the default `log`-backed telemetry. Call before sharing the manager.
    pub fn with_telemetry(self, telemetry: Telemetry) -> Self {
        match Arc::try_unwrap(self.shared) {
            Ok(mut shared) => {
                shared.telemetry = telemetry;
                Self {
                    shared: Arc::new(shared),
                }
            }
            Err(shared) => {
                warn!("SocketManager already shared; telemetry not replaced");
                Self { shared }
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Whether the handshake token is currently held. The token itself never leaves the manager.
    pub fn has_token(&self) -> bool {
        self.inner().token.is_some()
    }

    /// Listen for state transitions. Late subscribers see only later transitions.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(listener)
    }

    /// Connect and, when a token is available, authenticate.
    ///
    /// No-op when already connected. Concurrent calls are serialized; the
    /// second one finds the connection up and returns.
    ///
    /// # Errors
    ///
    /// - [`SocketError::Unavailable`] - manager built without a transport factory
    /// - [`SocketError::ConnectTimeout`] / [`SocketError::Transport`] - initial connect failed
    /// - [`SocketError::AuthHandshake`] - server rejected or ignored the token
    /// - [`SocketError::Cancelled`] - `disconnect()` was called mid-connect
    pub async fn connect(&self) -> Result<(), SocketError> {
        let Some(factory) = self.shared.factory.clone() else {
            self.shared.telemetry.warn(
                "Socket connect requested without transport capability",
                json!({ "url": self.shared.config.url }),
            );
            return Err(SocketError::Unavailable {
                message: String::from("No socket transport available in this context"),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let _serialized = self.shared.connect_lock.lock().await;

        if self.state().is_connected() {
            debug!("Socket already connected; connect() is a no-op");
            return Ok(());
        }

        // A transport left over from a failed or recovering session goes first
        self.dispose_transport();

        let generation = *self.shared.generation.borrow();
        let mut cancelled = self.shared.generation.subscribe();

        let token = self.fetch_token().await;
        if self.is_stale(generation) {
            return Err(cancelled_error());
        }

        self.set_state(ConnectionState::Connecting);

        let transport = match factory.create(&self.shared.config) {
            Ok(transport) => transport,
            Err(e) => return Err(self.fail_connect(generation, None, e)),
        };

        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        self.attach_lifecycle(&transport, generation, outcome_tx);
        self.replay_registrations(&transport);
        self.inner().transport = Some(Arc::clone(&transport));

        // disconnect() may have run while the factory was building the transport
        if self.is_stale(generation) {
            return Err(self.abandon(&transport));
        }

        info!("Socket connecting to {}", self.shared.config.url);
        transport.open();

        let connect_timeout = self.shared.config.connect_timeout();
        let outcome = tokio::select! {
            outcome = outcome_rx.recv() => outcome,
            _ = sleep(connect_timeout) => None,
            _ = cancelled.changed() => return Err(self.abandon(&transport)),
        };

        match outcome {
            Some(ConnectOutcome::Connected) => {}
            Some(ConnectOutcome::Failed(message)) => {
                let error = SocketError::Transport {
                    message,
                    location: ErrorLocation::from(Location::caller()),
                };
                return Err(self.fail_connect(generation, Some(&transport), error));
            }
            None => {
                let error = SocketError::ConnectTimeout {
                    message: format!(
                        "No connect event from {} within {}ms",
                        self.shared.config.url,
                        connect_timeout.as_millis()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                };
                return Err(self.fail_connect(generation, Some(&transport), error));
            }
        }

        let Some(token) = token else {
            info!("Socket connected as guest");
            return Ok(());
        };

        let handshake = tokio::select! {
            result = authenticate(&transport, &token, self.shared.config.auth_timeout()) => result,
            _ = cancelled.changed() => return Err(self.abandon(&transport)),
        };

        match handshake {
            Ok(()) => {
                if self.is_stale(generation) {
                    return Err(self.abandon(&transport));
                }
                self.inner().token = Some(token);
                info!("Socket connected and authenticated");
                Ok(())
            }
            Err(e) => Err(self.fail_connect(generation, Some(&transport), e)),
        }
    }

    /// Close the connection, drop the token, and cancel any in-flight `connect()`.
    pub fn disconnect(&self) {
        let transport = {
            let mut inner = self.inner();
            inner.token = None;
            inner.transport.take()
        };
        self.bump_generation();

        if let Some(transport) = transport {
            if transport.is_connected() {
                info!("Disconnecting socket");
            } else {
                debug!("Discarding socket that never finished connecting");
            }
            transport.close();
        }

        self.set_state(ConnectionState::Disconnected);
    }

    /// Register a handler for `event`.
    ///
    /// The registration is kept by the manager and re-attached to every
    /// transport it creates. Without a live transport the handler waits for
    /// the next `connect()`.
    pub fn on<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_handler(event, Arc::new(handler))
    }

    pub fn on_handler(&self, event: &str, handler: EventHandler) -> ListenerId {
        let id = ListenerId::new();
        self.registrations().push(Registration {
            event: event.to_string(),
            id,
            handler: Arc::clone(&handler),
        });

        match self.live_transport() {
            Some(transport) => transport.on(event, id, handler),
            None => self.shared.telemetry.warn(
                "No live socket; handler deferred until connect",
                json!({ "event": event }),
            ),
        }

        id
    }

    /// Remove one handler, or every handler for `event` when `id` is `None`.
    ///
    /// Only handlers registered through the manager are touched; its own
    /// lifecycle listeners on the transport stay attached.
    pub fn off(&self, event: &str, id: Option<ListenerId>) {
        let mut removed = Vec::new();
        self.registrations().retain(|r| {
            let matches = r.event == event && id.is_none_or(|id| r.id == id);
            if matches {
                removed.push(r.id);
            }
            !matches
        });

        match self.live_transport() {
            Some(transport) => {
                for id in removed {
                    transport.off(event, Some(id));
                }
            }
            None => self.shared.telemetry.warn(
                "No live socket; handler removed from pending registrations only",
                json!({ "event": event }),
            ),
        }
    }

    /// Send an event. Returns `false` (and never queues) when not connected.
    pub fn emit(&self, event: &str, data: Value) -> bool {
        let transport = {
            let inner = self.inner();
            if inner.state.is_connected() {
                inner.transport.clone()
            } else {
                None
            }
        };

        let Some(transport) = transport else {
            self.shared.telemetry.warn(
                "Socket not connected; event dropped",
                json!({ "event": event, "state": self.state() }),
            );
            return false;
        };

        match transport.emit(event, data) {
            Ok(()) => true,
            Err(e) => {
                self.shared
                    .telemetry
                    .warn("Socket emit failed", json!({ "event": event, "error": e.to_string() }));
                false
            }
        }
    }

    /// React to one auth change: logout disconnects, login reconnects with a fresh token.
    pub async fn handle_auth_signal(&self, signal: AuthSignal) {
        match signal {
            AuthSignal::Logout => {
                info!("Logout signal received; disconnecting socket");
                self.disconnect();
            }
            AuthSignal::Login => {
                info!("Login signal received; reconnecting socket with fresh token");
                self.disconnect();
                if let Err(e) = self.connect().await {
                    self.shared.telemetry.capture(&e, json!({ "trigger": "login" }));
                }
            }
        }
    }

    /// Follow `signals` in the background until the bus is dropped.
    pub fn listen_for_auth_signals(&self, signals: &AuthSignals) -> JoinHandle<()> {
        let mut receiver = signals.subscribe();
        let manager = self.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(signal) => manager.handle_auth_signal(signal).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {skipped} auth signal(s); continuing with the latest");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Auth signal listener stopped");
        })
    }

    // ============================================
    // INTERNALS
    // ============================================

    fn inner(&self) -> MutexGuard<'_, ManagerInner> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn registrations(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.shared
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn live_transport(&self) -> Option<Arc<dyn SocketTransport>> {
        self.inner().transport.clone()
    }

    fn is_stale(&self, generation: u64) -> bool {
        *self.shared.generation.borrow() != generation
    }

    fn bump_generation(&self) {
        self.shared.generation.send_modify(|generation| *generation += 1);
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = {
            let mut inner = self.inner();
            if inner.state == next {
                return;
            }
            std::mem::replace(&mut inner.state, next)
        };

        debug!("Socket state: {previous} -> {next}");
        self.shared.subscribers.notify(next);
    }

    async fn fetch_token(&self) -> Option<RedactedToken> {
        match self.shared.token_provider.fetch_socket_token().await {
            Ok(Some(token)) => Some(token),
            Ok(None) => {
                debug!("No socket token available; connecting as guest");
                None
            }
            Err(e) => {
                self.shared.telemetry.warn(
                    "Socket token fetch failed; connecting as guest",
                    json!({ "error": e.to_string() }),
                );
                None
            }
        }
    }

    fn dispose_transport(&self) {
        let transport = self.inner().transport.take();
        if let Some(transport) = transport {
            self.bump_generation();
            transport.close();
        }
    }

    /// Tear down after a failed connect owned by `generation`, and report it.
    #[track_caller]
    fn fail_connect(
        &self,
        generation: u64,
        transport: Option<&Arc<dyn SocketTransport>>,
        error: SocketError,
    ) -> SocketError {
        if self.is_stale(generation) {
            return match transport {
                Some(transport) => self.abandon(transport),
                None => cancelled_error(),
            };
        }

        {
            let mut inner = self.inner();
            inner.token = None;
        }
        self.dispose_transport();
        self.set_state(ConnectionState::Error);
        self.shared
            .telemetry
            .capture(&error, json!({ "url": self.shared.config.url }));

        error
    }

    /// Close the transport of a cancelled connect, unhooking it if it is still current.
    #[track_caller]
    fn abandon(&self, transport: &Arc<dyn SocketTransport>) -> SocketError {
        {
            let mut inner = self.inner();
            if inner
                .transport
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, transport))
            {
                inner.transport = None;
            }
        }
        transport.close();

        // disconnect() set Disconnected; a Connecting written after it must not stick
        if self.state() == ConnectionState::Connecting {
            self.set_state(ConnectionState::Disconnected);
        }

        cancelled_error()
    }

    fn replay_registrations(&self, transport: &Arc<dyn SocketTransport>) {
        let registrations = self.registrations();
        for registration in registrations.iter() {
            transport.on(
                &registration.event,
                registration.id,
                Arc::clone(&registration.handler),
            );
        }
        debug!("Replayed {} socket handler(s)", registrations.len());
    }

    fn attach_lifecycle(
        &self,
        transport: &Arc<dyn SocketTransport>,
        generation: u64,
        outcome: mpsc::UnboundedSender<ConnectOutcome>,
    ) {
        let weak = Arc::downgrade(&self.shared);

        let connected = outcome.clone();
        transport.on(
            events::CONNECT,
            ListenerId::new(),
            lifecycle_handler(&weak, generation, move |manager, _| {
                let recovering = manager.state() == ConnectionState::Reconnecting;
                manager.set_state(ConnectionState::Connected);
                let _ = connected.send(ConnectOutcome::Connected);
                if recovering {
                    manager.reauthenticate(generation);
                }
            }),
        );

        transport.on(
            events::CONNECT_ERROR,
            ListenerId::new(),
            lifecycle_handler(&weak, generation, move |_, payload| {
                let message = payload_message(payload, "connect_error");
                debug!("Socket connect error: {message}");
                let _ = outcome.send(ConnectOutcome::Failed(message));
            }),
        );

        transport.on(
            events::DISCONNECT,
            ListenerId::new(),
            lifecycle_handler(&weak, generation, |manager, payload| {
                let reason = payload_message(payload, "unknown");
                manager.shared.telemetry.warn(
                    "Socket disconnected by transport",
                    json!({ "reason": reason }),
                );
                manager.set_state(ConnectionState::Disconnected);
            }),
        );

        transport.on(
            events::RECONNECT_ATTEMPT,
            ListenerId::new(),
            lifecycle_handler(&weak, generation, |manager, payload| {
                if manager.state() == ConnectionState::Connecting {
                    return;
                }
                debug!("Socket reconnect attempt {}", payload["attempt"]);
                manager.set_state(ConnectionState::Reconnecting);
            }),
        );

        transport.on(
            events::RECONNECT_FAILED,
            ListenerId::new(),
            lifecycle_handler(&weak, generation, |manager, _| {
                manager.shared.telemetry.error(
                    "Socket reconnection exhausted",
                    json!({ "url": manager.shared.config.url }),
                );
                manager.set_state(ConnectionState::Error);
            }),
        );
    }

    /// Repeat the handshake after the transport reconnected on its own.
    fn reauthenticate(&self, generation: u64) {
        let Some(token) = self.inner().token.clone() else {
            return;
        };
        let Some(transport) = self.live_transport() else {
            return;
        };
        let manager = self.clone();

        tokio::spawn(async move {
            let result = authenticate(&transport, &token, manager.shared.config.auth_timeout()).await;
            if let Err(e) = result {
                if manager.is_stale(generation) {
                    return;
                }
                manager.shared.telemetry.capture(&e, json!({ "trigger": "reconnect" }));
                manager.dispose_transport();
                manager.inner().token = None;
                manager.set_state(ConnectionState::Error);
            }
        });
    }
}

/// Wrap a lifecycle callback so it only runs for the transport generation it was made for.
fn lifecycle_handler<F>(weak: &Weak<ManagerShared>, generation: u64, callback: F) -> EventHandler
where
    F: Fn(&SocketManager, &Value) + Send + Sync + 'static,
{
    let weak = weak.clone();
    Arc::new(move |payload: &Value| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let manager = SocketManager { shared };
        if manager.is_stale(generation) {
            return;
        }
        callback(&manager, payload);
    })
}

/// Emit `authenticate` and wait for `authenticated` / `unauthorized`.
async fn authenticate(
    transport: &Arc<dyn SocketTransport>,
    token: &RedactedToken,
    auth_timeout: Duration,
) -> Result<(), SocketError> {
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let accepted_id = ListenerId::new();
    let rejected_id = ListenerId::new();

    let accepted = reply_tx.clone();
    transport.on(
        events::AUTHENTICATED,
        accepted_id,
        Arc::new(move |_: &Value| {
            let _ = accepted.send(HandshakeOutcome::Accepted);
        }),
    );
    transport.on(
        events::UNAUTHORIZED,
        rejected_id,
        Arc::new(move |payload: &Value| {
            let _ = reply_tx.send(HandshakeOutcome::Rejected(payload_message(
                payload,
                "unauthorized",
            )));
        }),
    );

    let result = match transport.emit(events::AUTHENTICATE, json!({ "token": token.expose() })) {
        Err(e) => Err(SocketError::AuthHandshake {
            message: format!("Could not send authenticate: {e}"),
            location: ErrorLocation::from(Location::caller()),
        }),
        Ok(()) => match tokio::time::timeout(auth_timeout, reply_rx.recv()).await {
            Ok(Some(HandshakeOutcome::Accepted)) => Ok(()),
            Ok(Some(HandshakeOutcome::Rejected(message))) => Err(SocketError::AuthHandshake {
                message,
                location: ErrorLocation::from(Location::caller()),
            }),
            Ok(None) => Err(SocketError::AuthHandshake {
                message: String::from("Transport closed during authentication"),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(_) => Err(SocketError::AuthHandshake {
                message: format!("No authentication reply within {}ms", auth_timeout.as_millis()),
                location: ErrorLocation::from(Location::caller()),
            }),
        },
    };

    transport.off(events::AUTHENTICATED, Some(accepted_id));
    transport.off(events::UNAUTHORIZED, Some(rejected_id));

    result
}

fn payload_message(payload: &Value, fallback: &str) -> String {
    payload
        .get("message")
        .or_else(|| payload.get("reason"))
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

#[track_caller]
fn cancelled_error() -> SocketError {
    SocketError::Cancelled {
        message: String::from("disconnect() called while connecting"),
        location: ErrorLocation::from(Location::caller()),
    }
}
