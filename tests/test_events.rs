//! Tests for components/events.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use native_push::{
    EventHub, EventKind, NotificationCategoryType, NotificationPayload, NotificationResponse,
    PushError,
};

fn response(marker: &str) -> NotificationResponse {
    let data = NotificationPayload::from_attributes([("marker", marker)]);
    NotificationResponse::new(data, "", NotificationCategoryType::Default)
}

#[test]
fn test_multicast_delivery_order() {
    let hub = EventHub::new();
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let first = seen.clone();
    hub.on_token_refresh(move |token| first.lock().push(format!("first:{token}")));
    let second = seen.clone();
    hub.on_token_refresh(move |token| second.lock().push(format!("second:{token}")));

    hub.emit_token_refresh("t1");
    assert_eq!(*seen.lock(), vec!["first:t1", "second:t1"]);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let hub = EventHub::new();
    let count = Arc::new(AtomicUsize::new(0));

    let counter = count.clone();
    let subscription = hub.on_error(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    hub.emit_error(&PushError::RegistrationFailed("boom".to_string()));
    hub.unsubscribe(subscription);
    hub.emit_error(&PushError::RegistrationFailed("boom".to_string()));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(hub.subscriber_count(EventKind::Error), 0);
}

#[test]
fn test_opened_buffers_without_subscribers() {
    let hub = EventHub::new();

    hub.emit_notification_opened(&response("early"));
    assert!(hub.has_pending_opened());

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    hub.on_notification_opened(move |r| {
        sink.lock().push(r.data.get("marker").unwrap_or("").to_string());
    });

    // Exactly one replay, to the first subscriber only.
    assert_eq!(*seen.lock(), vec!["early"]);
    assert!(!hub.has_pending_opened());

    let late: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = late.clone();
    hub.on_notification_opened(move |r| {
        sink.lock().push(r.data.get("marker").unwrap_or("").to_string());
    });
    assert!(late.lock().is_empty());
}

#[test]
fn test_newer_pending_response_replaces_older() {
    let hub = EventHub::new();

    hub.emit_notification_opened(&response("one"));
    hub.emit_notification_opened(&response("two"));

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    hub.on_notification_opened(move |r| {
        sink.lock().push(r.data.get("marker").unwrap_or("").to_string());
    });

    assert_eq!(*seen.lock(), vec!["two"]);
}

#[test]
fn test_no_replay_when_subscriber_already_attached() {
    let hub = EventHub::new();
    let count = Arc::new(AtomicUsize::new(0));

    let counter = count.clone();
    hub.on_notification_opened(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    hub.emit_notification_opened(&response("live"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!hub.has_pending_opened());

    // A second subscriber joining later sees nothing retroactively.
    let counter = count.clone();
    hub.on_notification_opened(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_received_and_deleted_are_independent() {
    let hub = EventHub::new();
    let received = Arc::new(AtomicUsize::new(0));
    let deleted = Arc::new(AtomicUsize::new(0));

    let counter = received.clone();
    hub.on_notification_received(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = deleted.clone();
    hub.on_notification_deleted(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let payload = NotificationPayload::from_attributes([("k", "v")]);
    hub.emit_notification_received(&payload);
    hub.emit_notification_received(&payload);
    hub.emit_notification_deleted(&payload);

    assert_eq!(received.load(Ordering::SeqCst), 2);
    assert_eq!(deleted.load(Ordering::SeqCst), 1);
}
