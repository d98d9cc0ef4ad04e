use crate::RedactedToken;

/// **VALUE**: Verifies that neither Debug nor Display leak the token value.
///
/// **WHY THIS MATTERS**: The socket manager logs its state transitions and the HTTP client
/// logs request context. A token reaching either log is a credential leak.
///
/// **BUG THIS CATCHES**: Would catch a `#[derive(Debug)]` replacing the manual impl.
#[test]
fn given_token_when_formatted_then_value_is_redacted() {
    // GIVEN: A token with a recognizable value
    let token = RedactedToken::new("super-secret-value");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{token:?}");
    let display = format!("{token}");

    // THEN: The secret never appears
    assert!(!debug.contains("super-secret-value"));
    assert!(!display.contains("super-secret-value"));
    assert_eq!(token.expose(), "super-secret-value");
    assert_eq!(token.len(), "super-secret-value".len());
}

/// **VALUE**: Verifies that serialization is refused.
///
/// **WHY THIS MATTERS**: Tokens are held in memory only; they must never be persisted.
///
/// **BUG THIS CATCHES**: Would catch a derived `Serialize` that writes the raw value.
#[test]
fn given_token_when_serialized_then_returns_error() {
    // GIVEN: A token
    let token = RedactedToken::new("abc");

    // WHEN: Serializing to JSON
    let result = serde_json::to_string(&token);

    // THEN: Serialization fails without echoing the value
    let error = result.expect_err("Token serialization must fail").to_string();
    assert!(error.contains("Token Serialization Refused"));
    assert!(!error.contains("abc"));
}

/// **VALUE**: Verifies blank tokens from a collaborator are treated as absent.
///
/// **WHY THIS MATTERS**: An empty bearer header is worse than none; the backend answers 401
/// instead of serving the request as a guest.
///
/// **BUG THIS CATCHES**: Would catch whitespace-only tokens being accepted.
#[test]
fn given_blank_or_missing_value_when_from_optional_then_returns_none() {
    assert!(RedactedToken::from_optional(None).is_none());
    assert!(RedactedToken::from_optional(Some(String::new())).is_none());
    assert!(RedactedToken::from_optional(Some("   ".to_string())).is_none());
    assert!(RedactedToken::from_optional(Some("t".to_string())).is_some());
}
