//! Wiring: one instance of each connectivity component, built once at start-up.

use crate::cache::LoggingCache;
use crate::error::AppError;
use crate::probe::HealthProbe;
use crate::settings::Settings;

use common::RedactedToken;
use connectivity_core::NetworkConfig;
use connectivity_core::auth::{
    AnonymousProvider, AuthSignals, HttpSocketTokenProvider, SessionTokenProvider,
    SocketTokenProvider, StaticTokenProvider,
};
use connectivity_core::bridge::{EventBridge, default_event_mappings, setup_socket_event_mappings};
use connectivity_core::degraded::DegradedModeTracker;
use connectivity_core::http::HttpClient;
use connectivity_core::realtime::{SocketManager, TransportFactory, WsTransportFactory};
use connectivity_core::subscribers::Subscription;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use models::NetworkStatus;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

pub struct Netprobe {
    pub tracker: DegradedModeTracker,
    pub client: HttpClient,
    pub manager: SocketManager,
    pub signals: AuthSignals,
    probe: HealthProbe,
    poll_interval: Duration,
    bridge: Option<EventBridge>,
    auth_listener: Option<JoinHandle<()>>,
    subscriptions: Vec<Subscription>,
}

impl Netprobe {
    /// Build every component from `config`. Nothing touches the network yet.
    pub fn build(config: &NetworkConfig, settings: &Settings) -> Result<Self, AppError> {
        let session: Arc<dyn SessionTokenProvider> =
            match RedactedToken::from_optional(settings.session_token.clone()) {
                Some(token) => Arc::new(StaticTokenProvider::new(token)),
                None => Arc::new(AnonymousProvider),
            };

        let tracker = DegradedModeTracker::new(config.degraded.clone());
        let client = HttpClient::new(config, tracker.clone())
            .map_err(connectivity_core::CoreError::from)?
            .with_session_provider(Arc::clone(&session));

        let socket_tokens = socket_token_provider(config, settings, session)?;
        let factory: Arc<dyn TransportFactory> = Arc::new(WsTransportFactory);
        let manager = SocketManager::new(config.socket.clone(), Some(factory), socket_tokens);

        let mut subscriptions = Vec::new();
        subscriptions.push(tracker.subscribe(|status| match status {
            NetworkStatus::Online => info!("Network status: {status}"),
            NetworkStatus::Degraded | NetworkStatus::Offline => {
                warn!("Network status: {status}")
            }
        }));
        subscriptions.push(manager.subscribe(|state| info!("Socket state: {state}")));

        let bridge = setup_socket_event_mappings(
            &manager,
            Arc::new(LoggingCache),
            default_event_mappings(),
        );

        Ok(Self {
            probe: HealthProbe::new(client.clone(), settings.health_endpoint.clone()),
            poll_interval: settings.poll_interval,
            tracker,
            client,
            manager,
            signals: AuthSignals::new(),
            bridge: Some(bridge),
            auth_listener: None,
            subscriptions,
        })
    }

    pub fn probe(&self) -> &HealthProbe {
        &self.probe
    }

    /// Connect the socket, then poll health until `shutdown` resolves.
    pub async fn run<S>(mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        self.auth_listener = Some(self.manager.listen_for_auth_signals(&self.signals));

        // A failed initial connect is not fatal; the probe keeps reporting HTTP health
        if let Err(e) = self.manager.connect().await {
            warn!("Socket connect failed: {e}");
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let _ = self.probe.check().await;
                }
            }
        }

        self.shutdown();
    }

    fn shutdown(&mut self) {
        info!("Shutting down");
        if let Some(bridge) = self.bridge.take() {
            bridge.teardown();
        }
        if let Some(listener) = self.auth_listener.take() {
            listener.abort();
        }
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        self.manager.disconnect();
    }
}

fn socket_token_provider(
    config: &NetworkConfig,
    settings: &Settings,
    session: Arc<dyn SessionTokenProvider>,
) -> Result<Arc<dyn SocketTokenProvider>, AppError> {
    if let Some(token) = RedactedToken::from_optional(settings.socket_token.clone()) {
        return Ok(Arc::new(StaticTokenProvider::new(token)));
    }

    match &config.socket.token_endpoint {
        Some(endpoint) => {
            let provider = HttpSocketTokenProvider::new(endpoint, session)
                .map_err(connectivity_core::CoreError::from)?;
            Ok(Arc::new(provider))
        }
        None => Ok(Arc::new(AnonymousProvider)),
    }
}
