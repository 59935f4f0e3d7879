// Cross-platform push notification components
// Shared data model and leaf components used by every platform backend

use serde::{Deserialize, Serialize};

pub mod categories;
pub mod events;
pub mod identity;
pub mod payload;
pub mod presentation;
pub mod token;

pub use categories::CategoryRegistry;
pub use events::{EventHub, EventKind, Subscription};
pub use identity::AppIdentitySnapshot;
pub use payload::{NotificationCategoryType, NotificationPayload, NotificationResponse};
pub use presentation::ForegroundPresentation;
pub use token::{KeyValueStore, MemoryStore, TokenStore};

/// Error taxonomy for the push registration lifecycle.
///
/// Every native-layer failure is caught at the adapter boundary and converted
/// into one of these values, carrying the native diagnostic string. Failures
/// are reported through the error event and never propagate out of the
/// public registration operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum PushError {
    /// The user (or system policy) declined the notification permission.
    #[error("push notification permission denied: {0}")]
    PermissionDenied(String),
    /// The native push service failed to produce a registration token.
    #[error("push registration failed: {0}")]
    RegistrationFailed(String),
    /// The native push service failed to drop the registration.
    #[error("push unregistration failed: {0}")]
    UnregistrationFailed(String),
}

impl PushError {
    /// The native diagnostic carried by this error.
    pub fn diagnostic(&self) -> &str {
        match self {
            PushError::PermissionDenied(msg)
            | PushError::RegistrationFailed(msg)
            | PushError::UnregistrationFailed(msg) => msg,
        }
    }
}

pub type PushResult<T> = Result<T, PushError>;

/// Behavior flag for an interactive notification action.
///
/// Maps onto `UNNotificationActionOptions` on Apple platforms; other
/// platforms carry the flag through for their own action plumbing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationActionType {
    #[default]
    Default,
    /// The device must be unlocked before the action runs.
    AuthenticationRequired,
    /// Rendered as destructive (red) where the platform supports it.
    Destructive,
    /// Launches the app into the foreground.
    Foreground,
}

/// One interactive button offered on a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
    pub action_type: NotificationActionType,
}

impl NotificationAction {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            action_type: NotificationActionType::Default,
        }
    }

    pub fn with_type(mut self, action_type: NotificationActionType) -> Self {
        self.action_type = action_type;
        self
    }
}

/// A named set of interactive actions registered with the OS notification
/// center. Re-registration replaces the whole set; no per-category diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationUserCategory {
    pub category: String,
    pub actions: Vec<NotificationAction>,
    pub category_type: NotificationCategoryType,
}

impl NotificationUserCategory {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            actions: Vec::new(),
            category_type: NotificationCategoryType::Default,
        }
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_type(mut self, category_type: NotificationCategoryType) -> Self {
        self.category_type = category_type;
        self
    }
}
