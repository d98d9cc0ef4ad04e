use crate::auth::{AnonymousProvider, SessionTokenProvider};
use crate::config::NetworkConfig;
use crate::degraded::DegradedModeTracker;
use crate::error::HttpError;
use crate::http::config::TimeoutConfig;
use crate::http::options::RequestOptions;
use crate::http::response::Response;
use crate::http::{classify_failure, decode_body};
use crate::observability::Telemetry;
use crate::retry::{RequestAttempt, RetryConfig, attempts_allowed, next_delay, should_retry};
use crate::{REQUEST_ID_HEADER, USER_AGENT};

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::time::{sleep, timeout};
use url::Url;
use uuid::Uuid;

/// Request client with timeouts, typed errors and retries.
///
/// Cheap to clone: clones share the connection pool, the retry config and the
/// tracker. The client holds no per-request state, so concurrent calls are
/// fully independent.
#[derive(Clone)]
pub struct HttpClient {
    base_url: Url,
    client: Client,
    retry: Arc<RetryConfig>,
    timeouts: TimeoutConfig,
    tracker: DegradedModeTracker,
    session: Arc<dyn SessionTokenProvider>,
    telemetry: Telemetry,
}

impl HttpClient {
    pub fn new(config: &NetworkConfig, tracker: DegradedModeTracker) -> Result<Self, HttpError> {
        let base_url = parse_base_url(&config.http.base_url)?;
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            base_url,
            client,
            retry: Arc::new(config.retry.clone()),
            timeouts: config.timeouts.clone(),
            tracker,
            session: Arc::new(AnonymousProvider),
            telemetry: Telemetry::default(),
        })
    }

    pub fn with_session_provider(mut self, session: Arc<dyn SessionTokenProvider>) -> Self {
        self.session = session;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Response<T>, HttpError> {
        self.request(endpoint, RequestOptions::get()).await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<Response<T>, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::post().with_json(serde_json::to_value(body)?);
        self.request(endpoint, options).await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<Response<T>, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::put().with_json(serde_json::to_value(body)?);
        self.request(endpoint, options).await
    }

    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> Result<Response<T>, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::patch().with_json(serde_json::to_value(body)?);
        self.request(endpoint, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<Response<T>, HttpError> {
        self.request(endpoint, RequestOptions::delete()).await
    }

    /// Perform one logical request, retrying transient failures.
    ///
    /// Attempts run strictly one after another. Whatever the number of
    /// attempts, the degraded mode tracker hears about the call exactly once.
    ///
    /// # Errors
    ///
    /// Returns the classified [`HttpError`] of the last attempt once retries
    /// are exhausted, or immediately for non-retryable failures.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Response<T>, HttpError> {
        let request_id = Uuid::new_v4().to_string();

        let url = match self.resolve_url(endpoint) {
            Ok(url) => url,
            Err(e) => return Err(self.settle_failure(e, &options, endpoint, &request_id)),
        };

        let headers = self.build_headers(&options, &request_id).await;
        let max_attempts = if options.retry {
            attempts_allowed(&self.retry)
        } else {
            1
        };
        let attempt_timeout = options
            .timeout
            .unwrap_or_else(|| self.timeouts.for_profile(options.profile));

        let mut attempt_number = 1;
        loop {
            let started = Instant::now();

            match self
                .attempt::<T>(&url, &options, &headers, attempt_timeout)
                .await
            {
                Ok(response) => {
                    let attempt = RequestAttempt::succeeded(attempt_number, started.elapsed());
                    debug!("{} {url} {attempt} [{request_id}]", options.method);
                    self.tracker.record_success();
                    return Ok(response);
                }
                Err(error) => {
                    let attempt = RequestAttempt::failed(attempt_number, started.elapsed(), error);
                    let retry = attempt_number < max_attempts
                        && attempt
                            .error
                            .as_ref()
                            .is_some_and(|e| should_retry(e, &self.retry));

                    if retry {
                        let delay = next_delay(attempt_number, &self.retry);
                        warn!(
                            "{} {url} {attempt}; retrying in {}ms ({attempt_number}/{max_attempts}) [{request_id}]",
                            options.method,
                            delay.as_millis()
                        );
                        sleep(delay).await;
                        attempt_number += 1;
                        continue;
                    }

                    debug!("{} {url} {attempt} [{request_id}]", options.method);
                    let error = attempt
                        .into_error()
                        .unwrap_or_else(|| HttpError::unknown("Attempt failed without an error"));
                    return Err(self.settle_failure(error, &options, url.as_str(), &request_id));
                }
            }
        }
    }

    /// One attempt: send, read the body, classify. Raced against `attempt_timeout`.
    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &Url,
        options: &RequestOptions,
        headers: &HeaderMap,
        attempt_timeout: Duration,
    ) -> Result<Response<T>, HttpError> {
        let mut builder = self
            .client
            .request(options.method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();
            Ok::<_, HttpError>((status, headers, body))
        };

        // Dropping the exchange future on timeout abandons the in-flight call
        let (status, headers, body) = match timeout(attempt_timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(HttpError::Network {
                    message: format!("Request timed out after {}ms", attempt_timeout.as_millis()),
                    timed_out: true,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        if !HttpStatusCode(status).is_success() {
            return Err(classify_failure(status, &body));
        }

        let data = decode_body::<T>(&body)?;
        Ok(Response {
            data,
            status,
            headers,
        })
    }

    /// Record the final failure and report it. Returns the error for propagation.
    fn settle_failure(
        &self,
        error: HttpError,
        options: &RequestOptions,
        target: &str,
        request_id: &str,
    ) -> HttpError {
        self.tracker.record_failure();

        let context = json!({
            "method": options.method.as_str(),
            "url": target,
            "requestId": request_id,
            "status": error.status(),
            "code": error.code(),
        });

        let unrecoverable = error.is_network()
            || error
                .status()
                .is_some_and(|status| HttpStatusCode(status).is_server_error());

        if unrecoverable {
            self.telemetry.capture(&error, context);
        } else {
            self.telemetry.warn("Request failed", context);
        }

        error
    }

    async fn build_headers(&self, options: &RequestOptions, request_id: &str) -> HeaderMap {
        let mut headers = options.headers.clone();

        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        if options.skip_auth || headers.contains_key(AUTHORIZATION) {
            return headers;
        }

        // Best effort: a broken auth collaborator downgrades to an anonymous request
        match self.session.session_token().await {
            Ok(Some(token)) => match HeaderValue::from_str(&format!("Bearer {}", token.expose())) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Session token is not a valid header value; sending without auth"),
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Session token lookup failed; sending without auth: {e}");
                self.telemetry.warn(
                    "Session token lookup failed",
                    json!({ "requestId": request_id }),
                );
            }
        }

        headers
    }

    fn resolve_url(&self, endpoint: &str) -> Result<Url, HttpError> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(Url::parse(endpoint)?);
        }

        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, HttpError> {
    // `Url::join` drops the last path segment unless the base ends with '/'
    if base_url.ends_with('/') {
        Ok(Url::parse(base_url)?)
    } else {
        Ok(Url::parse(&format!("{base_url}/"))?)
    }
}
