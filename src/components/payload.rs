// Payload normalization - flattens OS-specific payload shapes into one map

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved wrapper key used by Apple push payloads.
const APS_KEY: &str = "aps";
/// The one sub-map under the wrapper that is flattened a level deeper.
const ALERT_KEY: &str = "alert";

/// Action identifier Apple reports for the plain tap on a notification.
/// Normalized to the empty string before a response is built.
pub const APPLE_DEFAULT_ACTION_IDENTIFIER: &str = "com.apple.UNNotificationDefaultActionIdentifier";

/// Payload keys that carry the sender's presentation priority, checked in
/// order; the first key present wins.
pub(crate) const PRIORITY_KEYS: [&str; 2] = ["priority", "aps.priority"];

/// The key/value data attached to an incoming push message, flattened to a
/// uniform `String -> String` shape.
///
/// Built fresh per incoming notification (or per launch-from-notification
/// event), immutable once constructed, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPayload {
    data: HashMap<String, String>,
}

impl NotificationPayload {
    /// Flatten an Apple-style nested payload.
    ///
    /// Scalar values under the reserved `aps` wrapper become `aps.<key>`;
    /// the `alert` sub-map flattens one level deeper to `aps.alert.<key>`;
    /// any other sub-map under the wrapper is dropped, as is a wrapper that
    /// is not a map. Remaining top-level entries coerce to strings as-is.
    pub fn from_nested(value: &Value) -> Self {
        let mut data = HashMap::new();
        let Some(map) = value.as_object() else {
            return Self { data };
        };

        for (key, val) in map {
            if key == APS_KEY {
                let Some(aps) = val.as_object() else { continue };
                for (aps_key, aps_val) in aps {
                    match aps_val {
                        Value::Object(alert) if aps_key == ALERT_KEY => {
                            for (alert_key, alert_val) in alert {
                                if let Some(text) = coerce(alert_val) {
                                    data.insert(
                                        format!("{APS_KEY}.{ALERT_KEY}.{alert_key}"),
                                        text,
                                    );
                                }
                            }
                        }
                        Value::Object(_) => {}
                        _ => {
                            if let Some(text) = coerce(aps_val) {
                                data.insert(format!("{APS_KEY}.{aps_key}"), text);
                            }
                        }
                    }
                }
            } else if let Some(text) = coerce(val) {
                data.insert(key.clone(), text);
            }
        }

        Self { data }
    }

    /// Pass a flat string-keyed payload (FCM data bundle, WNS raw JSON)
    /// through with string coercion of every value.
    pub fn from_flat(value: &Value) -> Self {
        let mut data = HashMap::new();
        if let Some(map) = value.as_object() {
            for (key, val) in map {
                if let Some(text) = coerce(val) {
                    data.insert(key.clone(), text);
                }
            }
        }
        Self { data }
    }

    /// Build from an already-flat attribute list (Windows toast XML).
    pub fn from_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The sender-declared presentation priority, if any.
    pub fn priority(&self) -> Option<NotificationPriority> {
        for key in PRIORITY_KEYS {
            if let Some(value) = self.get(key) {
                return Some(NotificationPriority::parse(value));
            }
        }
        None
    }
}

impl FromIterator<(String, String)> for NotificationPayload {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

fn coerce(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Presentation priority declared by the sender on a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationPriority {
    Max,
    High,
    #[default]
    Default,
    Low,
    Min,
}

impl NotificationPriority {
    /// Case-insensitive parse; unknown values fall back to `Default`.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "max" => NotificationPriority::Max,
            "high" => NotificationPriority::High,
            "low" => NotificationPriority::Low,
            "min" => NotificationPriority::Min,
            _ => NotificationPriority::Default,
        }
    }

    /// Whether this priority asks for a visible alert while the app is
    /// foregrounded.
    pub fn wants_alert(&self) -> bool {
        matches!(self, NotificationPriority::Max | NotificationPriority::High)
    }
}

/// How the user's interaction relates to the registered category actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationCategoryType {
    /// The platform's default tap action.
    #[default]
    Default,
    /// One of the custom actions registered for the category.
    Custom,
    /// The category's dismiss action.
    Dismiss,
}

/// The record of a user's interaction with a delivered notification.
///
/// Consumed exactly once by the opened event; when no subscriber is attached
/// yet it is buffered as the single pending response and replayed to the
/// first subscriber (see [`EventHub`](super::events::EventHub)).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub data: NotificationPayload,
    /// Identifier of the chosen action; empty for the default tap.
    pub identifier: String,
    pub category_type: NotificationCategoryType,
}

impl NotificationResponse {
    pub fn new(
        data: NotificationPayload,
        identifier: impl Into<String>,
        category_type: NotificationCategoryType,
    ) -> Self {
        Self {
            data,
            identifier: identifier.into(),
            category_type,
        }
    }
}

/// Collapse the platform's default-action identifier to the empty string,
/// leaving custom action identifiers untouched.
pub fn normalize_action_identifier(identifier: &str) -> String {
    if identifier.eq_ignore_ascii_case(APPLE_DEFAULT_ACTION_IDENTIFIER) {
        String::new()
    } else {
        identifier.to_string()
    }
}
