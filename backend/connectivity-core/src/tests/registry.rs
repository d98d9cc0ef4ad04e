use crate::realtime::{ListenerId, ListenerRegistry};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

fn counting_handler(counter: &Arc<AtomicUsize>) -> crate::realtime::EventHandler {
    let counter = counter.clone();
    Arc::new(move |_: &Value| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

/// **VALUE**: Verifies re-adding the same id replaces rather than duplicates.
///
/// **WHY THIS MATTERS**: Replays after reconnect reuse ids; duplicates would double-fire.
#[test]
fn given_same_id_when_added_twice_then_single_handler() {
    let registry = ListenerRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let id = ListenerId::new();

    registry.add("post:created", id, counting_handler(&calls));
    registry.add("post:created", id, counting_handler(&calls));

    assert_eq!(registry.dispatch("post:created", &json!({})), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies removal by id and by event.
#[test]
fn given_handlers_when_removing_then_by_id_or_all_for_event() {
    // GIVEN: Two handlers on one event and one on another
    let registry = ListenerRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let first = ListenerId::new();
    registry.add("a", first, counting_handler(&calls));
    registry.add("a", ListenerId::new(), counting_handler(&calls));
    registry.add("b", ListenerId::new(), counting_handler(&calls));

    // WHEN / THEN: Remove one by id
    registry.remove("a", Some(first));
    assert_eq!(registry.count("a"), 1);

    // WHEN / THEN: Remove the rest of "a"
    registry.remove("a", None);
    assert_eq!(registry.count("a"), 0);
    assert_eq!(registry.total(), 1);

    // WHEN / THEN: Unknown event dispatches to nobody
    assert_eq!(registry.dispatch("missing", &json!(null)), 0);
}

/// **VALUE**: Verifies a handler can remove itself during dispatch.
///
/// **BUG THIS CATCHES**: Would catch dispatch holding the registry lock (deadlock).
#[test]
fn given_self_removing_handler_when_dispatched_then_no_deadlock() {
    let registry = Arc::new(ListenerRegistry::new());
    let id = ListenerId::new();
    let inner = registry.clone();
    registry.add(
        "once",
        id,
        Arc::new(move |_: &Value| inner.remove("once", Some(id))),
    );

    assert_eq!(registry.dispatch("once", &json!(null)), 1);
    assert_eq!(registry.dispatch("once", &json!(null)), 0);
}
