//! HTTP status code utilities for error classification and retry logic.

/// HTTP status code for error categorization.
///
/// Stored directly rather than parsed from error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HttpStatusCode(pub u16);

impl HttpStatusCode {
    pub const UNAUTHORIZED: HttpStatusCode = HttpStatusCode(401);
    pub const FORBIDDEN: HttpStatusCode = HttpStatusCode(403);
    pub const NOT_FOUND: HttpStatusCode = HttpStatusCode(404);
    pub const UNPROCESSABLE_ENTITY: HttpStatusCode = HttpStatusCode(422);
    pub const INTERNAL_SERVER_ERROR: HttpStatusCode = HttpStatusCode(500);

    /// 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// 4xx client errors.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// 5xx server errors.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }

    /// Codes that usually indicate a transient failure.
    ///
    /// This is the seed for the configured retryable set, not the policy itself.
    pub fn is_transient(&self) -> bool {
        matches!(self.0, 408 | 429 | 500 | 502 | 503 | 504)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl From<u16> for HttpStatusCode {
    fn from(code: u16) -> Self {
        HttpStatusCode(code)
    }
}

impl std::fmt::Display for HttpStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
