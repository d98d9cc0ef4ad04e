use common::RedactedToken;
use connectivity_core::auth::{
    AnonymousProvider, HttpSocketTokenProvider, SocketTokenProvider, StaticTokenProvider,
};
use connectivity_core::error::AuthError;

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// **VALUE**: Verifies the token endpoint is called with the session and its token returned.
#[tokio::test]
async fn given_token_endpoint_when_fetching_then_token_returned() {
    // GIVEN
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/socket-token"))
        .and(header("authorization", "Bearer session-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "sock-1" })))
        .expect(1)
        .mount(&server)
        .await;
    let provider = HttpSocketTokenProvider::new(
        &format!("{}/api/socket-token", server.uri()),
        Arc::new(StaticTokenProvider::new(RedactedToken::new("session-1"))),
    )
    .unwrap();

    // WHEN
    let token = provider.fetch_socket_token().await.unwrap();

    // THEN
    assert_eq!(token.unwrap().expose(), "sock-1");
}

/// **VALUE**: Verifies "not signed in" answers mean guest, not failure.
///
/// **WHY THIS MATTERS**: Logged-out users must still get a socket.
#[tokio::test]
async fn given_401_or_blank_token_when_fetching_then_none() {
    // GIVEN: One endpoint refusing, one returning an empty token
    let server = MockServer::start().await;
    Mock::given(path("/refused"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(path("/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "  " })))
        .mount(&server)
        .await;
    let session = Arc::new(AnonymousProvider);
    let refused =
        HttpSocketTokenProvider::new(&format!("{}/refused", server.uri()), session.clone()).unwrap();
    let blank = HttpSocketTokenProvider::new(&format!("{}/blank", server.uri()), session).unwrap();

    // WHEN / THEN
    assert!(refused.fetch_socket_token().await.unwrap().is_none());
    assert!(blank.fetch_socket_token().await.unwrap().is_none());
}

/// **VALUE**: Verifies server errors are surfaced so the manager can log them.
#[tokio::test]
async fn given_500_when_fetching_then_token_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let provider = HttpSocketTokenProvider::new(
        &format!("{}/broken", server.uri()),
        Arc::new(AnonymousProvider),
    )
    .unwrap();

    let result = provider.fetch_socket_token().await;

    assert!(matches!(result, Err(AuthError::TokenFetch { .. })));
}
