//! Tests for components/categories.rs

use native_push::{
    CategoryRegistry, NotificationAction, NotificationActionType, NotificationUserCategory,
};

fn category(id: &str) -> NotificationUserCategory {
    NotificationUserCategory::new(id)
        .with_action(NotificationAction::new("reply", "Reply"))
        .with_action(
            NotificationAction::new("delete", "Delete")
                .with_type(NotificationActionType::Destructive),
        )
}

#[test]
fn test_register_is_full_replace() {
    let registry = CategoryRegistry::new();

    registry.replace(&[category("c1"), category("c2")]);
    let listed = registry.list();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].category, "c1");
    assert_eq!(listed[1].category, "c2");

    registry.replace(&[category("c3")]);
    let listed = registry.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].category, "c3");
}

#[test]
fn test_empty_replace_clears() {
    let registry = CategoryRegistry::new();
    registry.replace(&[category("c1")]);
    registry.replace(&[]);
    assert!(registry.is_empty());
}

#[test]
fn test_duplicate_ids_kept_as_supplied() {
    let registry = CategoryRegistry::new();
    registry.replace(&[category("dup"), category("dup")]);
    assert_eq!(registry.list().len(), 2);
}

#[test]
fn test_list_returns_copy() {
    let registry = CategoryRegistry::new();
    registry.replace(&[category("c1")]);

    let mut listed = registry.list();
    listed.clear();
    assert_eq!(registry.list().len(), 1);
}
