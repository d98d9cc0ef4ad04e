use crate::auth::provider::{SessionTokenProvider, SocketTokenProvider};
use crate::error::AuthError;

use common::{ErrorLocation, HttpStatusCode, RedactedToken};

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const TOKEN_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Fetches the socket token from an HTTP endpoint returning `{"token": "..."}`.
///
/// The request itself is authenticated with the session token when one is
/// available. 401 and 404 mean "no token for you" and yield `Ok(None)`.
#[derive(Clone)]
pub struct HttpSocketTokenProvider {
    client: Client,
    endpoint: Url,
    session: Arc<dyn SessionTokenProvider>,
}

impl HttpSocketTokenProvider {
    pub fn new(endpoint: &str, session: Arc<dyn SessionTokenProvider>) -> Result<Self, AuthError> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder()
            .timeout(TOKEN_FETCH_TIMEOUT)
            .user_agent(crate::USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            session,
        })
    }
}

#[async_trait]
impl SocketTokenProvider for HttpSocketTokenProvider {
    async fn fetch_socket_token(&self) -> Result<Option<RedactedToken>, AuthError> {
        let mut request = self.client.get(self.endpoint.clone());

        match self.session.session_token().await {
            Ok(Some(token)) => request = request.bearer_auth(token.expose()),
            Ok(None) => {}
            Err(e) => warn!("Session token unavailable for socket token fetch: {e}"),
        }

        let response = request.send().await?;
        let status = HttpStatusCode(response.status().as_u16());

        if status == HttpStatusCode::UNAUTHORIZED || status == HttpStatusCode::NOT_FOUND {
            debug!("Socket token endpoint answered {status}; connecting as guest");
            return Ok(None);
        }

        if !status.is_success() {
            return Err(AuthError::TokenFetch {
                message: format!(
                    "HTTP {status} - {}",
                    response.text().await.unwrap_or_default()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| AuthError::TokenDecode {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(RedactedToken::from_optional(body.token))
    }
}
