//! In-memory collaborators for unit tests.

use crate::auth::SocketTokenProvider;
use crate::bridge::{CacheUpdater, QueryCache};
use crate::error::{AuthError, SocketError};
use crate::realtime::{
    EventHandler, ListenerId, ListenerRegistry, SocketConfig, SocketTransport, TransportFactory,
    events,
};

use common::{ErrorLocation, RedactedToken};
use models::CacheKey;

use std::collections::HashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOpen {
    /// Fire `connect` synchronously from `open()`.
    Connect,
    /// Fire `connect_error`.
    Fail,
    /// Do nothing; the test drives events by hand.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnAuthenticate {
    Accept,
    Reject,
    Silent,
}

pub struct FakeTransport {
    listeners: ListenerRegistry,
    emitted: Mutex<Vec<(String, Value)>>,
    connected: AtomicBool,
    closed: AtomicBool,
    on_open: OnOpen,
    on_authenticate: OnAuthenticate,
}

impl FakeTransport {
    fn new(on_open: OnOpen, on_authenticate: OnAuthenticate) -> Self {
        Self {
            listeners: ListenerRegistry::new(),
            emitted: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            on_open,
            on_authenticate,
        }
    }

    /// Simulate an event arriving from the server or the transport itself.
    pub fn fire(&self, event: &str, payload: Value) -> usize {
        if event == events::CONNECT {
            self.connected.store(true, Ordering::SeqCst);
        } else if event == events::DISCONNECT {
            self.connected.store(false, Ordering::SeqCst);
        }
        self.listeners.dispatch(event, &payload)
    }

    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn emitted_count(&self, event: &str) -> usize {
        self.emitted().iter().filter(|(name, _)| name == event).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.count(event)
    }
}

impl SocketTransport for FakeTransport {
    fn open(&self) {
        match self.on_open {
            OnOpen::Connect => {
                self.fire(events::CONNECT, Value::Null);
            }
            OnOpen::Fail => {
                self.fire(events::CONNECT_ERROR, json!({ "message": "connection refused" }));
            }
            OnOpen::Silent => {}
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.listeners.clear();
    }

    fn on(&self, event: &str, id: ListenerId, handler: EventHandler) {
        self.listeners.add(event, id, handler);
    }

    fn off(&self, event: &str, id: Option<ListenerId>) {
        self.listeners.remove(event, id);
    }

    fn emit(&self, event: &str, data: Value) -> Result<(), SocketError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SocketError::Send {
                message: "fake transport not connected".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.emitted.lock().unwrap().push((event.to_string(), data));

        if event == events::AUTHENTICATE {
            match self.on_authenticate {
                OnAuthenticate::Accept => {
                    self.listeners.dispatch(events::AUTHENTICATED, &Value::Null);
                }
                OnAuthenticate::Reject => {
                    self.listeners
                        .dispatch(events::UNAUTHORIZED, &json!({ "message": "bad token" }));
                }
                OnAuthenticate::Silent => {}
            }
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

pub struct FakeFactory {
    on_open: OnOpen,
    on_authenticate: OnAuthenticate,
    create_delay: Option<Duration>,
    created: Mutex<Vec<Arc<FakeTransport>>>,
}

impl FakeFactory {
    pub fn new(on_open: OnOpen, on_authenticate: OnAuthenticate) -> Arc<Self> {
        Arc::new(Self {
            on_open,
            on_authenticate,
            create_delay: None,
            created: Mutex::new(Vec::new()),
        })
    }

    /// Factory whose `create()` blocks the calling thread for `delay` first.
    pub fn slow(on_open: OnOpen, on_authenticate: OnAuthenticate, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            on_open,
            on_authenticate,
            create_delay: Some(delay),
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn transport(&self, index: usize) -> Arc<FakeTransport> {
        Arc::clone(&self.created.lock().unwrap()[index])
    }

    pub fn latest(&self) -> Arc<FakeTransport> {
        Arc::clone(self.created.lock().unwrap().last().unwrap())
    }
}

impl TransportFactory for FakeFactory {
    fn create(&self, _config: &SocketConfig) -> Result<Arc<dyn SocketTransport>, SocketError> {
        if let Some(delay) = self.create_delay {
            std::thread::sleep(delay);
        }
        let transport = Arc::new(FakeTransport::new(self.on_open, self.on_authenticate));
        self.created.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}

/// Token provider that counts fetches.
pub struct CountingTokenProvider {
    token: Option<String>,
    fetches: AtomicUsize,
}

impl CountingTokenProvider {
    pub fn with_token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Some(token.to_string()),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn guest() -> Arc<Self> {
        Arc::new(Self {
            token: None,
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocketTokenProvider for CountingTokenProvider {
    async fn fetch_socket_token(&self) -> Result<Option<RedactedToken>, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone().map(RedactedToken::new))
    }
}

/// Socket config with short timeouts for tests.
pub fn fast_socket_config() -> SocketConfig {
    SocketConfig {
        connect_timeout_ms: 100,
        auth_timeout_ms: 100,
        ..SocketConfig::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheCall {
    Invalidate(CacheKey),
    Refetch(CacheKey),
    SetData(CacheKey, Option<Value>),
}

/// Cache that records calls and keeps values for `set_data`.
#[derive(Default)]
pub struct RecordingCache {
    calls: Mutex<Vec<CacheCall>>,
    data: Mutex<HashMap<String, Value>>,
}

impl RecordingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, key: &CacheKey, value: Value) {
        self.data.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn value(&self, key: &CacheKey) -> Option<Value> {
        self.data.lock().unwrap().get(&key.to_string()).cloned()
    }
}

impl QueryCache for RecordingCache {
    fn invalidate(&self, key: &CacheKey) {
        self.calls.lock().unwrap().push(CacheCall::Invalidate(key.clone()));
    }

    fn refetch(&self, key: &CacheKey) {
        self.calls.lock().unwrap().push(CacheCall::Refetch(key.clone()));
    }

    fn set_data(&self, key: &CacheKey, updater: CacheUpdater) {
        let current = self.value(key);
        let next = updater(current);
        match &next {
            Some(value) => {
                self.data.lock().unwrap().insert(key.to_string(), value.clone());
            }
            None => {
                self.data.lock().unwrap().remove(&key.to_string());
            }
        }
        self.calls
            .lock()
            .unwrap()
            .push(CacheCall::SetData(key.clone(), next));
    }
}
