//! Cross-platform push notification client bindings.
//!
//! This crate lets an application register for, receive, and react to push
//! notifications on Android (Firebase Cloud Messaging), iOS/macOS (APNs via
//! the UserNotifications framework), and Windows (WNS) by delegating to each
//! platform's native push subsystem. Every platform backend is a thin
//! adapter that forwards OS callbacks into a small set of cross-platform
//! events - token refresh, data received, data deleted, notification opened,
//! error - and persists the device token in platform key-value storage.
//!
//! The crate delivers nothing itself: message delivery, payload wire
//! formats, and server-side targeting belong to the OS push services.
//!
//! # Quick start
//!
//! ```no_run
//! use native_push::{InitOptions, PushManager};
//!
//! # async fn run() {
//! let push = PushManager::native();
//! let events = push.events();
//! events.on_token_refresh(|token| println!("token: {token}"));
//! events.on_notification_received(|payload| {
//!     println!("received {} keys", payload.len());
//! });
//! push.initialize(InitOptions::new());
//! # }
//! ```

pub mod backends;
pub mod components;
pub mod manager;

pub use backends::{DeliveredNotification, PushBackend, PushBackendFactory};
pub use components::payload::{
    APPLE_DEFAULT_ACTION_IDENTIFIER, NotificationPriority, normalize_action_identifier,
};
pub use components::{
    AppIdentitySnapshot, CategoryRegistry, EventHub, EventKind, ForegroundPresentation,
    KeyValueStore, MemoryStore, NotificationAction, NotificationActionType,
    NotificationCategoryType, NotificationPayload, NotificationResponse,
    NotificationUserCategory, PushError, PushResult, Subscription, TokenStore,
};
pub use manager::{
    DefaultNotificationHandler, FacadeState, InitOptions, NotificationHandler, PushManager,
};
