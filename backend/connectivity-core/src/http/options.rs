use crate::http::config::TimeoutProfile;

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

/// Per-call options for [`HttpClient::request`](crate::http::HttpClient::request).
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: HeaderMap,
    /// Don't ask the session collaborator for a token.
    pub skip_auth: bool,
    /// Overrides the profile timeout when set.
    pub timeout: Option<Duration>,
    pub profile: TimeoutProfile,
    /// `false` limits the call to a single attempt regardless of the retry config.
    pub retry: bool,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: HeaderMap::new(),
            skip_auth: false,
            timeout: None,
            profile: TimeoutProfile::Default,
            retry: true,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_profile(mut self, profile: TimeoutProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}
