use crate::error::AuthError;

use common::RedactedToken;

use async_trait::async_trait;

/// Supplies the bearer token attached to HTTP requests.
#[async_trait]
pub trait SessionTokenProvider: Send + Sync {
    /// `Ok(None)` means "no session": the request goes out unauthenticated.
    async fn session_token(&self) -> Result<Option<RedactedToken>, AuthError>;
}

/// Supplies the token used in the socket authenticate handshake.
#[async_trait]
pub trait SocketTokenProvider: Send + Sync {
    /// `Ok(None)` means the socket connects as a guest.
    async fn fetch_socket_token(&self) -> Result<Option<RedactedToken>, AuthError>;
}

/// Provider for contexts without a session.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousProvider;

#[async_trait]
impl SessionTokenProvider for AnonymousProvider {
    async fn session_token(&self) -> Result<Option<RedactedToken>, AuthError> {
        Ok(None)
    }
}

#[async_trait]
impl SocketTokenProvider for AnonymousProvider {
    async fn fetch_socket_token(&self) -> Result<Option<RedactedToken>, AuthError> {
        Ok(None)
    }
}

/// Provider returning a fixed token, e.g. one read from the environment at start-up.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: RedactedToken,
}

impl StaticTokenProvider {
    pub fn new(token: RedactedToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl SessionTokenProvider for StaticTokenProvider {
    async fn session_token(&self) -> Result<Option<RedactedToken>, AuthError> {
        Ok(Some(self.token.clone()))
    }
}

#[async_trait]
impl SocketTokenProvider for StaticTokenProvider {
    async fn fetch_socket_token(&self) -> Result<Option<RedactedToken>, AuthError> {
        Ok(Some(self.token.clone()))
    }
}
