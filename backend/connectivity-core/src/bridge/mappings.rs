use crate::bridge::QueryCache;
use crate::bridge::handlers::{
    CacheUpdateFn, KeySelector, create_invalidation_handler, create_refetch_handler,
    create_update_handler,
};
use crate::realtime::EventHandler;

use models::{CacheAction, CacheKey, ModelError};

use std::sync::Arc;

use serde_json::Value;

/// Server-pushed event names covered by [`default_event_mappings`].
pub mod event_names {
    pub const NOTIFICATION_NEW: &str = "notification:new";
    pub const NOTIFICATION_READ: &str = "notification:read";
    pub const MESSAGE_NEW: &str = "message:new";
    pub const POST_CREATED: &str = "post:created";
    pub const POST_UPDATED: &str = "post:updated";
    pub const POST_DELETED: &str = "post:deleted";
    pub const COMMENT_CREATED: &str = "comment:created";
    pub const USER_UPDATED: &str = "user:updated";
}

#[derive(Clone)]
enum MappingKind {
    Invalidate,
    Refetch,
    Update(CacheUpdateFn),
}

/// One row of the event-to-cache table.
#[derive(Clone)]
pub struct SocketEventMapping {
    event: String,
    selector: KeySelector,
    kind: MappingKind,
}

impl SocketEventMapping {
    pub fn invalidate(event: impl Into<String>, selector: KeySelector) -> Self {
        Self {
            event: event.into(),
            selector,
            kind: MappingKind::Invalidate,
        }
    }

    pub fn refetch(event: impl Into<String>, selector: KeySelector) -> Self {
        Self {
            event: event.into(),
            selector,
            kind: MappingKind::Refetch,
        }
    }

    pub fn update<F>(event: impl Into<String>, selector: KeySelector, updater: F) -> Self
    where
        F: Fn(Option<Value>, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            event: event.into(),
            selector,
            kind: MappingKind::Update(Arc::new(updater)),
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn action(&self) -> CacheAction {
        match self.kind {
            MappingKind::Invalidate => CacheAction::Invalidate,
            MappingKind::Refetch => CacheAction::Refetch,
            MappingKind::Update(_) => CacheAction::Update,
        }
    }

    pub fn selector(&self) -> &KeySelector {
        &self.selector
    }

    pub fn handler(&self, cache: Arc<dyn QueryCache>) -> EventHandler {
        let selector = self.selector.clone();
        match &self.kind {
            MappingKind::Invalidate => create_invalidation_handler(cache, selector),
            MappingKind::Refetch => create_refetch_handler(cache, selector),
            MappingKind::Update(updater) => {
                create_update_handler(cache, selector, Arc::clone(updater))
            }
        }
    }
}

impl std::fmt::Debug for SocketEventMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketEventMapping")
            .field("event", &self.event)
            .field("action", &self.action())
            .field("selector", &self.selector)
            .finish()
    }
}

/// The application's fixed table: notifications refetch, everything else invalidates.
pub fn default_event_mappings() -> Vec<SocketEventMapping> {
    use event_names::*;

    let post_keys = || KeySelector::computed(|payload| keyed_pair("posts", payload, "postId"));

    vec![
        SocketEventMapping::refetch(
            NOTIFICATION_NEW,
            KeySelector::fixed(vec![
                CacheKey::from_segments(&["notifications"]),
                CacheKey::from_segments(&["notifications", "unread-count"]),
            ]),
        ),
        SocketEventMapping::invalidate(
            NOTIFICATION_READ,
            KeySelector::fixed(vec![CacheKey::from_segments(&[
                "notifications",
                "unread-count",
            ])]),
        ),
        SocketEventMapping::invalidate(
            MESSAGE_NEW,
            KeySelector::computed(|payload| {
                Ok(vec![
                    CacheKey::from_segments(&["conversations"]),
                    CacheKey::builder()
                        .with_segment("messages")
                        .with_optional_segment(field(payload, "conversationId"))
                        .build()?,
                ])
            }),
        ),
        SocketEventMapping::invalidate(POST_CREATED, post_keys()),
        SocketEventMapping::invalidate(POST_UPDATED, post_keys()),
        SocketEventMapping::invalidate(POST_DELETED, post_keys()),
        SocketEventMapping::invalidate(
            COMMENT_CREATED,
            KeySelector::computed(|payload| {
                let post_id = field(payload, "postId");
                Ok(vec![
                    CacheKey::builder()
                        .with_segment("comments")
                        .with_optional_segment(post_id.clone())
                        .build()?,
                    CacheKey::builder()
                        .with_segment("posts")
                        .with_optional_segment(post_id)
                        .build()?,
                ])
            }),
        ),
        SocketEventMapping::invalidate(
            USER_UPDATED,
            KeySelector::computed(|payload| {
                Ok(vec![
                    CacheKey::builder()
                        .with_segment("users")
                        .with_optional_segment(field(payload, "userId"))
                        .build()?,
                ])
            }),
        ),
    ]
}

/// `[root]` plus `[root, payload[id_field]]`.
fn keyed_pair(root: &str, payload: &Value, id_field: &str) -> Result<Vec<CacheKey>, ModelError> {
    Ok(vec![
        CacheKey::from_segments(&[root]),
        CacheKey::builder()
            .with_segment(root)
            .with_optional_segment(field(payload, id_field))
            .build()?,
    ])
}

fn field(payload: &Value, name: &str) -> Option<Value> {
    payload.get(name).filter(|value| !value.is_null()).cloned()
}
