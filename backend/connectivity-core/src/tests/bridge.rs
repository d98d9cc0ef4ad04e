use crate::bridge::{
    KeySelector, SocketEventMapping, create_invalidation_handler, create_refetch_handler,
    create_update_handler, default_event_mappings, event_names, setup_socket_event_mappings,
};
use crate::realtime::SocketManager;
use crate::tests::support::{
    CacheCall, CountingTokenProvider, FakeFactory, OnAuthenticate, OnOpen, RecordingCache,
    fast_socket_config,
};

use models::{CacheAction, CacheKey};

use std::sync::Arc;

use serde_json::{Value, json};

fn key(segments: &[Value]) -> CacheKey {
    segments
        .iter()
        .fold(CacheKey::builder(), |builder, segment| {
            builder.with_segment(segment.clone())
        })
        .build()
        .unwrap()
}

/// **VALUE**: Verifies fixed keys are invalidated regardless of payload.
#[test]
fn given_fixed_selector_when_event_arrives_then_each_key_invalidated() {
    // GIVEN: A handler over two fixed keys
    let cache = RecordingCache::new();
    let handler = create_invalidation_handler(
        cache.clone(),
        KeySelector::fixed(vec![
            CacheKey::from_segments(&["notifications"]),
            CacheKey::from_segments(&["notifications", "unread-count"]),
        ]),
    );

    // WHEN
    handler(&json!({ "anything": true }));

    // THEN
    assert_eq!(
        cache.calls(),
        vec![
            CacheCall::Invalidate(CacheKey::from_segments(&["notifications"])),
            CacheCall::Invalidate(CacheKey::from_segments(&["notifications", "unread-count"])),
        ]
    );
}

/// **VALUE**: Verifies computed keys use payload values with their JSON type intact.
///
/// **BUG THIS CATCHES**: Would catch numeric ids being stringified, which never matches cached keys.
#[test]
fn given_computed_selector_when_event_arrives_then_keys_from_payload() {
    // GIVEN: A refetch handler keyed by postId
    let cache = RecordingCache::new();
    let handler = create_refetch_handler(
        cache.clone(),
        KeySelector::computed(|payload| {
            Ok(vec![
                CacheKey::builder()
                    .with_segment("posts")
                    .with_optional_segment(payload.get("postId").cloned())
                    .build()?,
            ])
        }),
    );

    // WHEN
    handler(&json!({ "postId": 42 }));

    // THEN
    assert_eq!(
        cache.calls(),
        vec![CacheCall::Refetch(key(&[json!("posts"), json!(42)]))]
    );
}

/// **VALUE**: Verifies a payload missing its id touches nothing.
///
/// **WHY THIS MATTERS**: `["posts", null]` would silently match no query; skipping is explicit.
#[test]
fn given_payload_without_id_when_event_arrives_then_no_cache_call() {
    let cache = RecordingCache::new();
    let mapping = default_event_mappings()
        .into_iter()
        .find(|mapping| mapping.event() == event_names::USER_UPDATED)
        .unwrap();

    mapping.handler(cache.clone())(&json!({ "name": "no id here" }));

    assert!(cache.calls().is_empty());
}

/// **VALUE**: Verifies update handlers run application logic instead of writing the payload.
///
/// **WHY THIS MATTERS**: Writing raw payloads into the cache would bypass response shaping.
#[test]
fn given_update_handler_when_event_arrives_then_updater_sees_current_value_and_payload() {
    // GIVEN: A cached unread count
    let cache = RecordingCache::new();
    let unread = CacheKey::from_segments(&["notifications", "unread-count"]);
    cache.seed(&unread, json!(3));
    let handler = create_update_handler(
        cache.clone(),
        KeySelector::fixed(vec![unread.clone()]),
        Arc::new(|current: Option<Value>, payload: &Value| {
            let count = current.and_then(|value| value.as_u64()).unwrap_or(0);
            let delta = payload["delta"].as_u64().unwrap_or(1);
            Some(json!(count + delta))
        }),
    );

    // WHEN
    handler(&json!({ "delta": 2 }));

    // THEN
    assert_eq!(cache.value(&unread), Some(json!(5)));
}

/// **VALUE**: Verifies the default table covers every documented event with the right action.
#[test]
fn given_default_table_when_inspected_then_actions_match() {
    let table = default_event_mappings();
    let action_of = |event: &str| {
        table
            .iter()
            .find(|mapping| mapping.event() == event)
            .map(SocketEventMapping::action)
    };

    assert_eq!(table.len(), 8);
    assert_eq!(action_of(event_names::NOTIFICATION_NEW), Some(CacheAction::Refetch));
    for event in [
        event_names::NOTIFICATION_READ,
        event_names::MESSAGE_NEW,
        event_names::POST_CREATED,
        event_names::POST_UPDATED,
        event_names::POST_DELETED,
        event_names::COMMENT_CREATED,
        event_names::USER_UPDATED,
    ] {
        assert_eq!(action_of(event), Some(CacheAction::Invalidate), "{event}");
    }
}

/// **VALUE**: Verifies comment events invalidate both the comments and the parent post.
#[test]
fn given_comment_created_when_handled_then_comments_and_post_invalidated() {
    let cache = RecordingCache::new();
    let mapping = default_event_mappings()
        .into_iter()
        .find(|mapping| mapping.event() == event_names::COMMENT_CREATED)
        .unwrap();

    mapping.handler(cache.clone())(&json!({ "postId": "p-1", "commentId": "c-9" }));

    assert_eq!(
        cache.calls(),
        vec![
            CacheCall::Invalidate(CacheKey::from_segments(&["comments", "p-1"])),
            CacheCall::Invalidate(CacheKey::from_segments(&["posts", "p-1"])),
        ]
    );
}

/// **VALUE**: Verifies mappings set up once keep working across reconnects and tear down cleanly.
///
/// **WHY THIS MATTERS**: Setup runs once at start-up; a reconnect must not drop cache sync.
///
/// **BUG THIS CATCHES**: Would catch bridge handlers attached only to the first transport.
#[tokio::test]
async fn given_bridge_when_transport_replaced_then_events_still_reach_cache() {
    // GIVEN: A bridge installed before the first connect
    let factory = FakeFactory::new(OnOpen::Connect, OnAuthenticate::Accept);
    let manager = SocketManager::new(
        fast_socket_config(),
        Some(factory.clone()),
        CountingTokenProvider::guest(),
    );
    let cache = RecordingCache::new();
    let bridge = setup_socket_event_mappings(&manager, cache.clone(), default_event_mappings());
    assert_eq!(bridge.len(), 8);

    // WHEN: Connect, cycle the connection, and receive an event on the new transport
    manager.connect().await.unwrap();
    manager.disconnect();
    manager.connect().await.unwrap();
    factory
        .transport(1)
        .fire(event_names::POST_UPDATED, json!({ "postId": 7 }));

    // THEN: The cache saw the invalidations
    assert_eq!(
        cache.calls(),
        vec![
            CacheCall::Invalidate(CacheKey::from_segments(&["posts"])),
            CacheCall::Invalidate(key(&[json!("posts"), json!(7)])),
        ]
    );

    // WHEN: Tearing down
    bridge.teardown();

    // THEN: Live transport no longer delivers
    assert_eq!(factory.transport(1).listener_count(event_names::POST_UPDATED), 0);
    factory
        .transport(1)
        .fire(event_names::POST_UPDATED, json!({ "postId": 8 }));
    assert_eq!(cache.calls().len(), 2);
}
