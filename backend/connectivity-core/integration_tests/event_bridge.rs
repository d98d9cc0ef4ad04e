use crate::helpers::{RecordingCache, TestSocketServer, socket_config, wait_until, within};

use connectivity_core::auth::AnonymousProvider;
use connectivity_core::bridge::{
    KeySelector, SocketEventMapping, default_event_mappings, event_names,
    setup_socket_event_mappings,
};
use connectivity_core::realtime::{SocketManager, WsTransportFactory};
use models::CacheKey;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

const LIMIT: Duration = Duration::from_secs(3);

fn guest_manager(url: &str) -> SocketManager {
    SocketManager::new(
        socket_config(url),
        Some(Arc::new(WsTransportFactory)),
        Arc::new(AnonymousProvider),
    )
}

/// **VALUE**: Verifies server-pushed events land in the cache through the default table.
///
/// **WHY THIS MATTERS**: This is the whole point of the bridge: the UI refreshes without polling.
///
/// **BUG THIS CATCHES**: Would catch mappings registered under the wrong event names.
#[tokio::test]
async fn given_default_mappings_when_server_pushes_events_then_cache_updated() {
    // GIVEN: A connected manager with the default table installed
    let server = TestSocketServer::start().await;
    let manager = guest_manager(&server.url);
    let cache = Arc::new(RecordingCache::default());
    let bridge = setup_socket_event_mappings(&manager, cache.clone(), default_event_mappings());
    within(manager.connect()).await.unwrap();

    // WHEN: The server pushes a notification and a message
    server.push(event_names::NOTIFICATION_NEW, json!({ "id": "n-1" }));
    server.push(event_names::MESSAGE_NEW, json!({ "conversationId": 12 }));

    // THEN
    assert!(wait_until(LIMIT, || cache.calls().len() == 4).await);
    assert_eq!(
        cache.calls(),
        vec![
            r#"refetch ["notifications"]"#,
            r#"refetch ["notifications","unread-count"]"#,
            r#"invalidate ["conversations"]"#,
            r#"invalidate ["messages",12]"#,
        ]
    );

    bridge.teardown();
    manager.disconnect();
}

/// **VALUE**: Verifies custom update mappings compute the new value from the payload.
#[tokio::test]
async fn given_update_mapping_when_event_pushed_then_updater_result_stored() {
    // GIVEN: A mapping that writes a derived value
    let server = TestSocketServer::start().await;
    let manager = guest_manager(&server.url);
    let cache = Arc::new(RecordingCache::default());
    let mapping = SocketEventMapping::update(
        "presence:changed",
        KeySelector::fixed(vec![CacheKey::from_segments(&["presence"])]),
        |_current: Option<Value>, payload: &Value| Some(json!({ "online": payload["count"] })),
    );
    let _bridge = setup_socket_event_mappings(&manager, cache.clone(), vec![mapping]);
    within(manager.connect()).await.unwrap();

    // WHEN
    server.push("presence:changed", json!({ "count": 3, "secret": "never cached" }));

    // THEN: Only the derived value, never the raw payload
    assert!(wait_until(LIMIT, || cache.calls().len() == 1).await);
    assert_eq!(cache.calls(), vec![r#"set ["presence"] {"online":3}"#]);

    manager.disconnect();
}
