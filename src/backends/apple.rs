// Apple platform adapter - UserNotifications framework + APNs registration
//
// Permission requests, category registration, and delivered-notification
// management go through UNUserNotificationCenter. Remote-notification
// registration itself is an application-object call
// (`registerForRemoteNotifications`) that must happen on the main thread,
// so the host's app delegate performs it after `register()` resolves and
// forwards the resulting device token (or failure) through
// `PushManager::handle_device_token` / `handle_registration_failed`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, Bool};
use objc2_foundation::{NSArray, NSDictionary, NSError, NSNumber, NSSet, NSString, NSUserDefaults};
use objc2_user_notifications::{
    UNAuthorizationOptions, UNNotification, UNNotificationAction, UNNotificationActionOptions,
    UNNotificationCategory, UNNotificationCategoryOptions, UNUserNotificationCenter,
};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::components::{
    KeyValueStore, NotificationActionType, NotificationCategoryType, NotificationPayload,
    NotificationUserCategory, PushError, PushResult,
};

use super::{DeliveredNotification, PushBackend};

/// Converts a `FnOnce` closure into a `Fn` closure suitable for block2
/// completion handlers that fire at most once.
///
/// # Panics
/// Panics if the returned closure is called more than once.
fn fnonce_to_fn1<F, A, R>(closure: F) -> impl Fn(A) -> R
where
    F: FnOnce(A) -> R,
{
    use std::cell::Cell;
    let cell = Cell::new(Some(closure));
    move |arg| {
        let closure = cell.take().expect("completion handler called more than once");
        closure(arg)
    }
}

/// Variant for completion handlers with two arguments.
fn fnonce_to_fn2<F, A, B, R>(closure: F) -> impl Fn(A, B) -> R
where
    F: FnOnce(A, B) -> R,
{
    use std::cell::Cell;
    let cell = Cell::new(Some(closure));
    move |a, b| {
        let closure = cell.take().expect("completion handler called more than once");
        closure(a, b)
    }
}

/// Token and identity persistence over `NSUserDefaults`.
pub struct UserDefaultsStore;

impl UserDefaultsStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UserDefaultsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for UserDefaultsStore {
    fn get(&self, key: &str) -> Option<String> {
        let defaults = unsafe { NSUserDefaults::standardUserDefaults() };
        let value = unsafe { defaults.stringForKey(&NSString::from_str(key)) };
        value.map(|s| s.to_string())
    }

    fn set(&self, key: &str, value: &str) {
        let defaults = unsafe { NSUserDefaults::standardUserDefaults() };
        let value_ns = NSString::from_str(value);
        let object: &AnyObject = &value_ns;
        unsafe { defaults.setObject_forKey(Some(object), &NSString::from_str(key)) };
    }

    fn remove(&self, key: &str) {
        let defaults = unsafe { NSUserDefaults::standardUserDefaults() };
        unsafe { defaults.removeObjectForKey(&NSString::from_str(key)) };
    }
}

pub struct AppleBackend;

impl AppleBackend {
    pub fn new() -> Self {
        Self
    }

    fn center() -> Retained<UNUserNotificationCenter> {
        unsafe { UNUserNotificationCenter::currentNotificationCenter() }
    }

    /// Flatten a `userInfo` dictionary into the shared payload shape by way
    /// of a JSON tree: sub-dictionaries recurse, strings and numbers are
    /// stringified, anything else is dropped.
    fn user_info_to_json(dictionary: &NSDictionary<AnyObject, AnyObject>) -> Value {
        let mut map = serde_json::Map::new();
        for key in dictionary.allKeys().iter() {
            let Some(key_text) = key.downcast_ref::<NSString>().map(|s| s.to_string()) else {
                continue;
            };
            let Some(value) = dictionary.objectForKey(&key) else {
                continue;
            };
            if let Some(nested) = value.downcast_ref::<NSDictionary>() {
                map.insert(key_text, Self::user_info_to_json(nested));
            } else if let Some(text) = value.downcast_ref::<NSString>() {
                map.insert(key_text, Value::String(text.to_string()));
            } else if let Some(number) = value.downcast_ref::<NSNumber>() {
                map.insert(key_text, Value::String(number.stringValue().to_string()));
            }
        }
        Value::Object(map)
    }

    fn delivered_from_native(notification: &UNNotification) -> DeliveredNotification {
        let request = unsafe { notification.request() };
        let native_id = unsafe { request.identifier() }.to_string();
        let user_info = unsafe { request.content().userInfo() };
        let data = NotificationPayload::from_nested(&Self::user_info_to_json(&user_info));
        DeliveredNotification::new(native_id, data)
    }
}

impl Default for AppleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PushBackend for AppleBackend {
    fn register(
        &self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel::<PushResult<()>>();
            let tx = Arc::new(Mutex::new(Some(tx)));

            // Scoped so the non-Send block is dropped before the await.
            {
                let center = Self::center();
                let options = UNAuthorizationOptions::Alert
                    | UNAuthorizationOptions::Badge
                    | UNAuthorizationOptions::Sound;

                // SAFETY: every captured variable is Send + Sync; Apple
                // retains the heap-allocated block and invokes it once on an
                // arbitrary queue.
                let block = RcBlock::new(fnonce_to_fn2(
                    move |granted: Bool, error: *mut NSError| {
                        let outcome = if !error.is_null() {
                            let description =
                                unsafe { (*error).localizedDescription() }.to_string();
                            Err(PushError::PermissionDenied(description))
                        } else if !granted.as_bool() {
                            Err(PushError::PermissionDenied(
                                "push notification permission not granted".to_string(),
                            ))
                        } else {
                            Ok(())
                        };
                        if let Ok(mut sender) = tx.lock() {
                            if let Some(sender) = sender.take() {
                                let _ = sender.send(outcome);
                            }
                        }
                    },
                ));

                unsafe {
                    center.requestAuthorizationWithOptions_completionHandler(options, &block);
                }
            }

            match rx.await {
                Ok(Ok(())) => {
                    tracing::info!("notification permission granted, awaiting device token");
                    // The host registers for remote notifications on the
                    // main thread and feeds the token back in.
                    Ok(None)
                }
                Ok(Err(error)) => Err(error),
                Err(_) => Err(PushError::RegistrationFailed(
                    "authorization callback never fired".to_string(),
                )),
            }
        })
    }

    fn unregister(&self) -> Pin<Box<dyn Future<Output = PushResult<()>> + Send + '_>> {
        // `unregisterForRemoteNotifications` is an application-object call
        // owned by the host; locally there is nothing to drop.
        Box::pin(async { Ok(()) })
    }

    fn normalize(&self, payload: &Value) -> NotificationPayload {
        NotificationPayload::from_nested(payload)
    }

    fn list_delivered(
        &self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Vec<DeliveredNotification>>> + Send + '_>> {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel::<Vec<DeliveredNotification>>();
            let tx = Arc::new(Mutex::new(Some(tx)));

            {
                let center = Self::center();
                // SAFETY: captures are Send + Sync; the delivered array is
                // only touched inside the callback.
                let block = RcBlock::new(fnonce_to_fn1(
                    move |delivered: std::ptr::NonNull<NSArray<UNNotification>>| {
                        let delivered = unsafe { delivered.as_ref() };
                        let notifications = delivered
                            .iter()
                            .map(|notification| Self::delivered_from_native(&notification))
                            .collect();
                        if let Ok(mut sender) = tx.lock() {
                            if let Some(sender) = sender.take() {
                                let _ = sender.send(notifications);
                            }
                        }
                    },
                ));
                unsafe { center.getDeliveredNotificationsWithCompletionHandler(&block) };
            }

            match rx.await {
                Ok(notifications) => Ok(notifications),
                Err(_) => {
                    tracing::warn!("delivered-notification callback never fired");
                    Ok(Vec::new())
                }
            }
        })
    }

    fn remove_delivered(&self, native_ids: &[String]) -> PushResult<()> {
        let identifiers: Vec<Retained<NSString>> = native_ids
            .iter()
            .map(|id| NSString::from_str(id))
            .collect();
        let refs: Vec<&NSString> = identifiers.iter().map(|id| &**id).collect();
        let array = NSArray::from_slice(&refs);
        unsafe { Self::center().removeDeliveredNotificationsWithIdentifiers(&array) };
        Ok(())
    }

    fn remove_all_delivered(&self) -> PushResult<()> {
        unsafe { Self::center().removeAllDeliveredNotifications() };
        Ok(())
    }

    fn set_categories(&self, categories: &[NotificationUserCategory]) -> PushResult<()> {
        let mut native_categories: Vec<Retained<UNNotificationCategory>> = Vec::new();

        for category in categories {
            let mut native_actions: Vec<Retained<UNNotificationAction>> = Vec::new();
            for action in &category.actions {
                let options = match action.action_type {
                    NotificationActionType::Default => UNNotificationActionOptions::empty(),
                    NotificationActionType::AuthenticationRequired => {
                        UNNotificationActionOptions::AuthenticationRequired
                    }
                    NotificationActionType::Destructive => {
                        UNNotificationActionOptions::Destructive
                    }
                    NotificationActionType::Foreground => UNNotificationActionOptions::Foreground,
                };
                let native_action = unsafe {
                    UNNotificationAction::actionWithIdentifier_title_options(
                        &NSString::from_str(&action.id),
                        &NSString::from_str(&action.title),
                        options,
                    )
                };
                native_actions.push(native_action);
            }

            let action_refs: Vec<&UNNotificationAction> =
                native_actions.iter().map(|action| &**action).collect();
            let category_options = if category.category_type == NotificationCategoryType::Dismiss {
                UNNotificationCategoryOptions::CustomDismissAction
            } else {
                UNNotificationCategoryOptions::empty()
            };
            let native_category = unsafe {
                UNNotificationCategory::categoryWithIdentifier_actions_intentIdentifiers_options(
                    &NSString::from_str(&category.category),
                    &NSArray::from_slice(&action_refs),
                    &NSArray::new(),
                    category_options,
                )
            };
            native_categories.push(native_category);
        }

        let category_refs: Vec<&UNNotificationCategory> =
            native_categories.iter().map(|category| &**category).collect();
        let set = NSSet::from_slice(&category_refs);
        unsafe { Self::center().setNotificationCategories(&set) };
        tracing::debug!(count = categories.len(), "notification categories forwarded to center");
        Ok(())
    }
}
