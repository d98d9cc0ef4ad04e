//! Authentication collaborator seams.
//!
//! The core never owns credentials. It asks a provider for a token when it
//! needs one and listens on [`AuthSignals`] for login/logout changes.

mod http_token;
mod provider;
mod signals;

pub use http_token::HttpSocketTokenProvider;
pub use provider::{AnonymousProvider, SessionTokenProvider, SocketTokenProvider, StaticTokenProvider};
pub use signals::AuthSignals;
