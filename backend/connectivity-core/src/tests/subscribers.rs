use crate::subscribers::Subscribers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// **VALUE**: Verifies every listener gets each value, in registration order.
#[test]
fn given_two_listeners_when_notifying_then_both_called_in_order() {
    // GIVEN: Two listeners appending to one log
    let subscribers = Subscribers::<u32>::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = log.clone();
    let second = log.clone();
    let _a = subscribers.subscribe(move |value| first.lock().unwrap().push(("a", value)));
    let _b = subscribers.subscribe(move |value| second.lock().unwrap().push(("b", value)));

    // WHEN
    subscribers.notify(7);

    // THEN
    assert_eq!(*log.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    assert_eq!(subscribers.len(), 2);
}

/// **VALUE**: Verifies a listener may unsubscribe others while being notified.
///
/// **WHY THIS MATTERS**: UI components tear down in response to status changes.
///
/// **BUG THIS CATCHES**: Would catch listeners being called while the list lock is held (deadlock).
#[test]
fn given_listener_that_mutates_list_when_notifying_then_no_deadlock() {
    // GIVEN: A listener that subscribes another listener when called
    let subscribers = Subscribers::<()>::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = subscribers.clone();
    let counter = calls.clone();
    let _outer = subscribers.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = inner.subscribe(|_| {});
    });

    // WHEN
    subscribers.notify(());

    // THEN: Called once, new listener only sees later values
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(subscribers.len(), 2);
}

/// **VALUE**: Verifies unsubscribe removes exactly one listener.
#[test]
fn given_two_subscriptions_when_one_unsubscribes_then_other_remains() {
    let subscribers = Subscribers::<u8>::new();
    let a = subscribers.subscribe(|_| {});
    let _b = subscribers.subscribe(|_| {});

    a.unsubscribe();

    assert_eq!(subscribers.len(), 1);
    assert!(!subscribers.is_empty());
}
