//! Tests for components/payload.rs

use native_push::{
    APPLE_DEFAULT_ACTION_IDENTIFIER, ForegroundPresentation, NotificationPayload,
    NotificationPriority, normalize_action_identifier,
};
use serde_json::json;

#[test]
fn test_nested_payload_flattening() {
    let payload = NotificationPayload::from_nested(&json!({
        "aps": {
            "id": 7,
            "alert": { "title": "T", "body": "B" }
        },
        "custom": "x"
    }));

    assert_eq!(payload.len(), 4);
    assert_eq!(payload.get("aps.id"), Some("7"));
    assert_eq!(payload.get("aps.alert.title"), Some("T"));
    assert_eq!(payload.get("aps.alert.body"), Some("B"));
    assert_eq!(payload.get("custom"), Some("x"));
}

#[test]
fn test_nested_payload_drops_non_alert_sub_maps() {
    let payload = NotificationPayload::from_nested(&json!({
        "aps": {
            "sound": "default",
            "thread": { "id": "t1" }
        }
    }));

    assert_eq!(payload.get("aps.sound"), Some("default"));
    assert!(!payload.contains_key("aps.thread.id"));
    assert!(!payload.contains_key("aps.thread"));
}

#[test]
fn test_nested_payload_drops_scalar_wrapper() {
    let payload = NotificationPayload::from_nested(&json!({
        "aps": "not-a-map",
        "custom": 42
    }));

    assert!(!payload.contains_key("aps"));
    assert_eq!(payload.get("custom"), Some("42"));
}

#[test]
fn test_flat_payload_coerces_values() {
    let payload = NotificationPayload::from_flat(&json!({
        "id": 5,
        "silent": true,
        "body": "hello",
        "skipped": null
    }));

    assert_eq!(payload.get("id"), Some("5"));
    assert_eq!(payload.get("silent"), Some("true"));
    assert_eq!(payload.get("body"), Some("hello"));
    assert!(!payload.contains_key("skipped"));
}

#[test]
fn test_attribute_payload() {
    let payload = NotificationPayload::from_attributes([("launch", "args"), ("duration", "long")]);
    assert_eq!(payload.get("launch"), Some("args"));
    assert_eq!(payload.get("duration"), Some("long"));
}

#[test]
fn test_priority_plain_key_wins_over_reserved() {
    let payload = NotificationPayload::from_nested(&json!({
        "priority": "low",
        "aps": { "priority": "high" }
    }));
    assert_eq!(payload.priority(), Some(NotificationPriority::Low));
}

#[test]
fn test_priority_reserved_key_fallback() {
    let payload = NotificationPayload::from_nested(&json!({
        "aps": { "priority": "MAX" }
    }));
    assert_eq!(payload.priority(), Some(NotificationPriority::Max));
}

#[test]
fn test_priority_unknown_value_is_default() {
    assert_eq!(NotificationPriority::parse("urgent"), NotificationPriority::Default);
    assert_eq!(NotificationPriority::parse("HIGH"), NotificationPriority::High);
}

#[test]
fn test_presentation_per_payload() {
    let high = NotificationPayload::from_flat(&json!({ "priority": "high" }));
    let presentation = ForegroundPresentation::for_payload(&high);
    assert!(presentation.alert);
    assert!(presentation.sound);

    let low = NotificationPayload::from_flat(&json!({ "priority": "low" }));
    let presentation = ForegroundPresentation::for_payload(&low);
    assert!(!presentation.alert);
    assert!(presentation.sound);

    let absent = NotificationPayload::from_flat(&json!({ "body": "x" }));
    assert!(!ForegroundPresentation::for_payload(&absent).alert);
}

#[test]
fn test_default_action_identifier_normalization() {
    assert_eq!(normalize_action_identifier(APPLE_DEFAULT_ACTION_IDENTIFIER), "");
    assert_eq!(
        normalize_action_identifier("COM.APPLE.UNNOTIFICATIONDEFAULTACTIONIDENTIFIER"),
        ""
    );
    assert_eq!(normalize_action_identifier("reply"), "reply");
}
