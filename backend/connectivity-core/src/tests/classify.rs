use crate::error::HttpError;
use crate::http::{classify_failure, decode_body};

use serde_json::json;

/// **VALUE**: Verifies the status-specific variants callers branch on.
///
/// **WHY THIS MATTERS**: 401 triggers re-login and 404 renders "not found"; both rely on the variant.
///
/// **BUG THIS CATCHES**: Would catch a status falling through to the generic `Request` variant.
#[test]
fn given_well_known_statuses_when_classifying_then_dedicated_variants() {
    assert!(matches!(classify_failure(401, b""), HttpError::Unauthorized { .. }));
    assert!(matches!(classify_failure(403, b""), HttpError::Forbidden { .. }));
    assert!(matches!(classify_failure(404, b""), HttpError::NotFound { .. }));
    assert!(matches!(classify_failure(422, b"{}"), HttpError::Validation { .. }));
}

/// **VALUE**: Verifies validation details survive classification.
///
/// **WHY THIS MATTERS**: Forms highlight fields from these details.
#[test]
fn given_422_with_details_when_classifying_then_details_and_message_kept() {
    // GIVEN: A typical validation body
    let body = json!({
        "message": "Invalid input",
        "details": { "email": ["is taken"] }
    })
    .to_string();

    // WHEN
    let error = classify_failure(422, body.as_bytes());

    // THEN
    assert_eq!(error.message(), "Invalid input");
    assert_eq!(error.details(), Some(&json!({ "email": ["is taken"] })));
    assert_eq!(error.status(), Some(422));
}

/// **VALUE**: Verifies nested `error` objects and backend codes are picked up.
#[test]
fn given_nested_error_body_when_classifying_then_code_and_message_extracted() {
    // GIVEN: `{"error": {"code": ..., "message": ...}}`
    let body = json!({ "error": { "code": "RATE_LIMITED", "message": "Slow down" } }).to_string();

    // WHEN
    let error = classify_failure(429, body.as_bytes());

    // THEN
    assert_eq!(error.code(), "RATE_LIMITED");
    assert_eq!(error.message(), "Slow down");
    assert_eq!(error.status(), Some(429));
}

/// **VALUE**: Verifies unstructured bodies still produce a usable error.
///
/// **BUG THIS CATCHES**: Would catch an HTML error page being dumped whole into the message.
#[test]
fn given_plain_text_or_empty_body_when_classifying_then_fallback_message_and_code() {
    // GIVEN: A long HTML page and an empty body
    let html = format!("<html>{}</html>", "x".repeat(1_000));

    // WHEN
    let from_html = classify_failure(502, html.as_bytes());
    let from_empty = classify_failure(503, b"");

    // THEN: Truncated text, canonical reason, synthesized code
    assert_eq!(from_html.message().chars().count(), 200);
    assert_eq!(from_html.code(), "HTTP_502");
    assert_eq!(from_empty.message(), "Service Unavailable");
    assert_eq!(from_empty.code(), "HTTP_503");
}

/// **VALUE**: Verifies empty success bodies decode to unit and `None`.
#[test]
fn given_empty_body_when_decoding_then_null_semantics() {
    decode_body::<()>(b"").unwrap();
    let optional: Option<u32> = decode_body(b"  ").unwrap();
    assert_eq!(optional, None);

    let error = decode_body::<u32>(b"not json").unwrap_err();
    assert_eq!(error.code(), "DECODE_ERROR");
    assert!(!error.is_network());
    assert!(error.is_local());
}
