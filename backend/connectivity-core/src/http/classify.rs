use crate::error::HttpError;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const MAX_TEXT_MESSAGE_LEN: usize = 200;

/// Turn a non-2xx response into the matching [`HttpError`] variant.
///
/// The body is mined for `{code, message, details}`, either at the top level
/// or nested under `error`. Plain-text bodies become the message.
#[track_caller]
pub(crate) fn classify_failure(status: u16, body: &[u8]) -> HttpError {
    let location = ErrorLocation::from(Location::caller());
    let parsed = ErrorBody::parse(body);
    let message = parsed
        .message
        .clone()
        .unwrap_or_else(|| default_message(status));

    match HttpStatusCode(status) {
        HttpStatusCode::UNAUTHORIZED => HttpError::Unauthorized { message, location },
        HttpStatusCode::FORBIDDEN => HttpError::Forbidden { message, location },
        HttpStatusCode::NOT_FOUND => HttpError::NotFound { message, location },
        HttpStatusCode::UNPROCESSABLE_ENTITY => HttpError::Validation {
            message,
            details: parsed.details,
            location,
        },
        _ => HttpError::Request {
            status,
            code: parsed.code.unwrap_or_else(|| format!("HTTP_{status}")),
            message,
            details: parsed.details,
            location,
        },
    }
}

/// Decode a 2xx body. Empty bodies decode from `null` so `()` and `Option<_>` work.
#[track_caller]
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }

    Ok(serde_json::from_slice(body)?)
}

#[derive(Debug, Default)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<Value>,
}

impl ErrorBody {
    fn parse(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => Self::from_object(&object),
            Ok(Value::String(text)) => Self::from_text(&text),
            Ok(_) => Self::default(),
            Err(_) => Self::from_text(&String::from_utf8_lossy(body)),
        }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let mut parsed = match object.get("error") {
            Some(Value::Object(nested)) => Self::from_object(nested),
            Some(Value::String(text)) => Self {
                message: Some(text.clone()),
                ..Self::default()
            },
            _ => Self::default(),
        };

        if parsed.code.is_none() {
            parsed.code = object.get("code").and_then(code_string);
        }
        if parsed.message.is_none() {
            parsed.message = object
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        if parsed.details.is_none() {
            parsed.details = object
                .get("details")
                .or_else(|| object.get("errors"))
                .filter(|value| !value.is_null())
                .cloned();
        }

        parsed
    }

    fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        Self {
            message: Some(trimmed.chars().take(MAX_TEXT_MESSAGE_LEN).collect()),
            ..Self::default()
        }
    }
}

fn code_string(value: &Value) -> Option<String> {
    match value {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

fn default_message(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
