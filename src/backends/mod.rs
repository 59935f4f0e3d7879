// Platform adapters - one per OS, selected at compile time
// Each backend bridges the native push lifecycle to the shared event shape

#[cfg(target_os = "android")]
pub mod android;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub mod apple;
#[cfg(target_os = "windows")]
pub mod windows;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::components::{
    AppIdentitySnapshot, KeyValueStore, MemoryStore, NotificationPayload,
    NotificationUserCategory, PushResult,
};

/// Keys a delivered notification may carry its id under: the plain key and
/// the platform-reserved alternate for the same semantic field.
const ID_TAG_KEY_PAIRS: [(&str, &str); 2] = [("id", "tag"), ("aps.id", "aps.tag")];

/// A notification currently sitting in the OS notification center, as
/// reported by the platform. Used only for targeted removal.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredNotification {
    /// The platform's own identifier for the delivered entry.
    pub native_id: String,
    /// Flattened user-info attached to the entry.
    pub data: NotificationPayload,
}

impl DeliveredNotification {
    pub fn new(native_id: impl Into<String>, data: NotificationPayload) -> Self {
        Self {
            native_id: native_id.into(),
            data,
        }
    }

    /// Whether this entry matches the requested id, and tag when one is
    /// given. The plain and reserved key pairs are checked independently;
    /// a tag-qualified match requires id and tag under the same pair.
    pub fn matches(&self, tag: Option<&str>, id: i64) -> bool {
        let id = id.to_string();
        ID_TAG_KEY_PAIRS.iter().any(|(id_key, tag_key)| {
            self.data.get(id_key) == Some(id.as_str())
                && tag.is_none_or(|tag| self.data.get(tag_key) == Some(tag))
        })
    }
}

/// Capability interface every platform adapter implements.
///
/// Registration methods return boxed futures so the trait stays object-safe
/// while backends await native completion handlers. All native failures are
/// converted to the [`PushError`](crate::components::PushError) taxonomy at
/// this boundary.
pub trait PushBackend: Send + Sync {
    /// Request notification permission where the platform requires it, then
    /// ask the native push service for a registration token.
    ///
    /// Returns `Ok(Some(token))` when the native API yields the token
    /// inline (FCM, WNS) and `Ok(None)` when the token arrives later
    /// through a host callback (APNs device-token delivery).
    fn register(&self)
    -> Pin<Box<dyn Future<Output = PushResult<Option<String>>> + Send + '_>>;

    /// Best-effort native deregistration. The local token cache is cleared
    /// by the caller regardless of the outcome.
    fn unregister(&self) -> Pin<Box<dyn Future<Output = PushResult<()>> + Send + '_>>;

    /// Normalize this platform's native payload shape into the flat map.
    fn normalize(&self, payload: &Value) -> NotificationPayload;

    /// Notifications currently delivered to the OS notification center.
    fn list_delivered(
        &self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Vec<DeliveredNotification>>> + Send + '_>>;

    /// Remove specific delivered entries by their native identifiers.
    fn remove_delivered(&self, native_ids: &[String]) -> PushResult<()>;

    /// Remove every delivered notification for the app.
    fn remove_all_delivered(&self) -> PushResult<()>;

    /// Forward the full category set in the platform representation.
    fn set_categories(&self, categories: &[NotificationUserCategory]) -> PushResult<()>;

    /// The current install identity, on platforms where a token is bound to
    /// the installed package version.
    fn current_identity(&self) -> Option<AppIdentitySnapshot> {
        None
    }
}

/// Factory for the platform adapter of the current target.
pub struct PushBackendFactory;

impl PushBackendFactory {
    /// Create the adapter for the compile target, or `None` when no push
    /// subsystem exists here.
    pub fn create() -> Option<Arc<dyn PushBackend>> {
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        let backend: Option<Arc<dyn PushBackend>> = Some(Arc::new(apple::AppleBackend::new()));
        #[cfg(target_os = "android")]
        let backend: Option<Arc<dyn PushBackend>> = Some(Arc::new(
            android::AndroidBackend::new(android::ChannelOptions::default()),
        ));
        #[cfg(target_os = "windows")]
        let backend: Option<Arc<dyn PushBackend>> =
            Some(Arc::new(windows::WindowsBackend::new()));
        #[cfg(not(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "android",
            target_os = "windows"
        )))]
        let backend = None;
        backend
    }

    /// The platform's persistent key-value store, or the in-process
    /// fallback where none exists.
    pub fn default_store() -> Arc<dyn KeyValueStore> {
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        let store: Arc<dyn KeyValueStore> = Arc::new(apple::UserDefaultsStore::new());
        #[cfg(target_os = "android")]
        let store: Arc<dyn KeyValueStore> = Arc::new(android::SharedPreferencesStore::new());
        #[cfg(target_os = "windows")]
        let store: Arc<dyn KeyValueStore> = Arc::new(windows::LocalSettingsStore::new());
        #[cfg(not(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "android",
            target_os = "windows"
        )))]
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store
    }
}
