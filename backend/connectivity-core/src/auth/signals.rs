use models::AuthSignal;

use log::debug;
use tokio::sync::broadcast;

const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Process-wide bus for login/logout notifications.
///
/// The auth module publishes; the socket manager (and anyone else) subscribes.
/// Neither side holds a reference to the other.
#[derive(Debug, Clone)]
pub struct AuthSignals {
    sender: broadcast::Sender<AuthSignal>,
}

impl AuthSignals {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish a signal. Returns how many subscribers will see it.
    pub fn publish(&self, signal: AuthSignal) -> usize {
        match self.sender.send(signal) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("Auth signal {signal:?} published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthSignal> {
        self.sender.subscribe()
    }
}

impl Default for AuthSignals {
    fn default() -> Self {
        Self::new()
    }
}
