// Windows platform adapter - WNS channel registration + toast history
//
// The channel URI is the device token. Incoming raw/toast payloads reach the
// app through its activation or background-task plumbing; the host forwards
// them to `PushManager::handle_payload_received` (raw JSON parsed into a
// `Value`, toast XML attributes via `NotificationPayload::from_attributes`).

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use windows::Foundation::{IPropertyValue, PropertyValue};
use windows::Networking::PushNotifications::{
    PushNotificationChannel, PushNotificationChannelManager,
};
use windows::Storage::ApplicationData;
use windows::UI::Notifications::ToastNotificationManager;
use windows::core::HSTRING;

use crate::components::{
    KeyValueStore, NotificationPayload, NotificationUserCategory, PushError, PushResult,
};

use super::{DeliveredNotification, PushBackend};

/// Token and identity persistence over `ApplicationData.LocalSettings`.
pub struct LocalSettingsStore;

impl LocalSettingsStore {
    pub fn new() -> Self {
        Self
    }

    fn values() -> windows::core::Result<windows::Foundation::Collections::IPropertySet> {
        ApplicationData::Current()?.LocalSettings()?.Values()
    }
}

impl Default for LocalSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for LocalSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = Self::values().ok()?;
        let value = values.Lookup(&HSTRING::from(key)).ok()?;
        let value: IPropertyValue = value.cast().ok()?;
        value.GetString().ok().map(|s| s.to_string_lossy())
    }

    fn set(&self, key: &str, value: &str) {
        let result = Self::values().and_then(|values| {
            let boxed = PropertyValue::CreateString(&HSTRING::from(value))?;
            values.Insert(&HSTRING::from(key), &boxed)
        });
        if let Err(error) = result {
            tracing::warn!(key, error = ?error, "local settings write failed");
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(values) = Self::values() {
            let _ = values.Remove(&HSTRING::from(key));
        }
    }
}

pub struct WindowsBackend {
    channel: Arc<Mutex<Option<PushNotificationChannel>>>,
}

impl WindowsBackend {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for WindowsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PushBackend for WindowsBackend {
    fn register(
        &self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            // No permission prompt on Windows; the channel request is the
            // whole registration.
            let channel = PushNotificationChannelManager::CreatePushNotificationChannelForApplicationAsync()
                .and_then(|operation| operation.get())
                .map_err(|error| {
                    PushError::RegistrationFailed(format!(
                        "failed to create WNS channel: {error:?}"
                    ))
                })?;

            let uri = channel
                .Uri()
                .map_err(|error| {
                    PushError::RegistrationFailed(format!("WNS channel has no URI: {error:?}"))
                })?
                .to_string_lossy();

            if let Ok(mut slot) = self.channel.lock() {
                *slot = Some(channel);
            }
            tracing::info!("WNS channel created");
            Ok(Some(uri))
        })
    }

    fn unregister(&self) -> Pin<Box<dyn Future<Output = PushResult<()>> + Send + '_>> {
        Box::pin(async move {
            let channel = self.channel.lock().ok().and_then(|mut slot| slot.take());
            if let Some(channel) = channel {
                channel.Close().map_err(|error| {
                    PushError::UnregistrationFailed(format!(
                        "failed to close WNS channel: {error:?}"
                    ))
                })?;
            }
            Ok(())
        })
    }

    fn normalize(&self, payload: &Value) -> NotificationPayload {
        NotificationPayload::from_flat(payload)
    }

    fn list_delivered(
        &self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Vec<DeliveredNotification>>> + Send + '_>> {
        Box::pin(async move {
            let history = match ToastNotificationManager::History().and_then(|h| h.GetHistory()) {
                Ok(history) => history,
                Err(error) => {
                    tracing::warn!(error = ?error, "toast history unavailable");
                    return Ok(Vec::new());
                }
            };

            let mut delivered = Vec::new();
            for toast in history {
                let Ok(tag) = toast.Tag() else { continue };
                let mut attributes: Vec<(String, String)> = Vec::new();
                if let Ok(values) = toast.Data().and_then(|data| data.Values()) {
                    for pair in values {
                        if let (Ok(key), Ok(value)) = (pair.Key(), pair.Value()) {
                            attributes.push((key.to_string_lossy(), value.to_string_lossy()));
                        }
                    }
                }
                delivered.push(DeliveredNotification::new(
                    tag.to_string_lossy(),
                    NotificationPayload::from_attributes(attributes),
                ));
            }
            Ok(delivered)
        })
    }

    fn remove_delivered(&self, native_ids: &[String]) -> PushResult<()> {
        let history = match ToastNotificationManager::History() {
            Ok(history) => history,
            Err(error) => {
                tracing::warn!(error = ?error, "toast history unavailable");
                return Ok(());
            }
        };
        for tag in native_ids {
            if let Err(error) = history.Remove(&HSTRING::from(tag.as_str())) {
                tracing::warn!(%tag, error = ?error, "toast removal failed");
            }
        }
        Ok(())
    }

    fn remove_all_delivered(&self) -> PushResult<()> {
        if let Ok(history) = ToastNotificationManager::History() {
            if let Err(error) = history.Clear() {
                tracing::warn!(error = ?error, "toast history clear failed");
            }
        }
        Ok(())
    }

    fn set_categories(&self, categories: &[NotificationUserCategory]) -> PushResult<()> {
        // WNS has no category registration; actions are declared in the
        // toast XML per notification. The cross-platform cache is all there
        // is to keep.
        tracing::debug!(count = categories.len(), "categories cached (no WNS representation)");
        Ok(())
    }
}
