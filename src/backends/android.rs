// Android platform adapter - Firebase Cloud Messaging over JNI
//
// Registration reads the FCM instance token; rotation callbacks from the
// app's FirebaseMessagingService are forwarded by host glue through
// `PushManager::handle_token_refresh`, incoming data bundles through
// `handle_payload_received`, and deleted-message callbacks through
// `handle_payload_deleted`. Android has no runtime notification permission
// prompt here, so `register()` goes straight to the token.

use std::future::Future;
use std::pin::Pin;

use jni::objects::{JObject, JObjectArray, JString, JValue};
use jni::{JNIEnv, JavaVM};
use serde_json::Value;

use crate::components::{
    AppIdentitySnapshot, KeyValueStore, NotificationPayload, NotificationUserCategory, PushError,
    PushResult,
};

use super::{DeliveredNotification, PushBackend};

const PREFS_NAME: &str = "native_push";
const FIREBASE_INSTANCE_ID_CLASS: &str = "com/google/firebase/iid/FirebaseInstanceId";

/// Run a closure against an attached JNI environment and the application
/// context, clearing any pending Java exception on failure.
fn with_jni<R>(
    f: impl for<'local> FnOnce(&mut JNIEnv<'local>, &JObject<'local>) -> jni::errors::Result<R>,
) -> Result<R, String> {
    let ctx = ndk_context::android_context();
    let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }.map_err(|e| e.to_string())?;
    let mut env = vm.attach_current_thread().map_err(|e| e.to_string())?;
    let context = unsafe { JObject::from_raw(ctx.context().cast()) };
    match f(&mut env, &context) {
        Ok(value) => Ok(value),
        Err(error) => {
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_describe();
                let _ = env.exception_clear();
            }
            Err(error.to_string())
        }
    }
}

fn get_shared_preferences<'a>(
    env: &mut JNIEnv<'a>,
    context: &JObject<'a>,
) -> jni::errors::Result<JObject<'a>> {
    let name = env.new_string(PREFS_NAME)?;
    env.call_method(
        context,
        "getSharedPreferences",
        "(Ljava/lang/String;I)Landroid/content/SharedPreferences;",
        &[JValue::Object(&name), JValue::Int(0)],
    )?
    .l()
}

fn java_to_string(env: &mut JNIEnv, object: &JObject) -> jni::errors::Result<Option<String>> {
    if object.is_null() {
        return Ok(None);
    }
    let text = env
        .call_method(object, "toString", "()Ljava/lang/String;", &[])?
        .l()?;
    if text.is_null() {
        return Ok(None);
    }
    let text: String = env.get_string(&JString::from(text))?.into();
    Ok(Some(text))
}

/// Token and identity persistence over `SharedPreferences`, under a fixed
/// private group name.
pub struct SharedPreferencesStore;

impl SharedPreferencesStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SharedPreferencesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for SharedPreferencesStore {
    fn get(&self, key: &str) -> Option<String> {
        with_jni(|env, context| {
            let prefs = get_shared_preferences(env, context)?;
            let key = env.new_string(key)?;
            let value = env
                .call_method(
                    &prefs,
                    "getString",
                    "(Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;",
                    &[JValue::Object(&key), JValue::Object(&JObject::null())],
                )?
                .l()?;
            if value.is_null() {
                Ok(None)
            } else {
                Ok(Some(env.get_string(&JString::from(value))?.into()))
            }
        })
        .unwrap_or_else(|error| {
            tracing::warn!(key, %error, "shared preferences read failed");
            None
        })
    }

    fn set(&self, key: &str, value: &str) {
        let result = with_jni(|env, context| {
            let prefs = get_shared_preferences(env, context)?;
            let editor = env
                .call_method(
                    &prefs,
                    "edit",
                    "()Landroid/content/SharedPreferences$Editor;",
                    &[],
                )?
                .l()?;
            let key = env.new_string(key)?;
            let value = env.new_string(value)?;
            env.call_method(
                &editor,
                "putString",
                "(Ljava/lang/String;Ljava/lang/String;)Landroid/content/SharedPreferences$Editor;",
                &[JValue::Object(&key), JValue::Object(&value)],
            )?;
            env.call_method(&editor, "commit", "()Z", &[])?;
            Ok(())
        });
        if let Err(error) = result {
            tracing::warn!(key, %error, "shared preferences write failed");
        }
    }

    fn remove(&self, key: &str) {
        let result = with_jni(|env, context| {
            let prefs = get_shared_preferences(env, context)?;
            let editor = env
                .call_method(
                    &prefs,
                    "edit",
                    "()Landroid/content/SharedPreferences$Editor;",
                    &[],
                )?
                .l()?;
            let key = env.new_string(key)?;
            env.call_method(
                &editor,
                "remove",
                "(Ljava/lang/String;)Landroid/content/SharedPreferences$Editor;",
                &[JValue::Object(&key)],
            )?;
            env.call_method(&editor, "commit", "()Z", &[])?;
            Ok(())
        });
        if let Err(error) = result {
            tracing::warn!(key, %error, "shared preferences remove failed");
        }
    }
}

/// Default notification channel created for API 26+ devices so delivered
/// notifications have somewhere to land.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub channel_id: String,
    pub channel_name: String,
    /// Name of a raw sound resource; `None` keeps the system default.
    pub channel_sound: Option<String>,
    pub create_default_channel: bool,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            channel_id: "PushNotificationChannel".to_string(),
            channel_name: "General".to_string(),
            channel_sound: None,
            create_default_channel: true,
        }
    }
}

pub struct AndroidBackend {
    channel: ChannelOptions,
}

impl AndroidBackend {
    pub fn new(channel: ChannelOptions) -> Self {
        Self { channel }
    }

    fn sdk_int(env: &mut JNIEnv) -> jni::errors::Result<i32> {
        let version = env.find_class("android/os/Build$VERSION")?;
        env.get_static_field(version, "SDK_INT", "I")?.i()
    }

    fn notification_manager<'a>(
        env: &mut JNIEnv<'a>,
        context: &JObject<'a>,
    ) -> jni::errors::Result<JObject<'a>> {
        let service = env.new_string("notification")?;
        env.call_method(
            context,
            "getSystemService",
            "(Ljava/lang/String;)Ljava/lang/Object;",
            &[JValue::Object(&service)],
        )?
        .l()
    }

    fn ensure_channel(&self) {
        if !self.channel.create_default_channel {
            return;
        }
        let options = self.channel.clone();
        let result = with_jni(|env, context| {
            if Self::sdk_int(env)? < 26 {
                return Ok(());
            }
            let channel_class = env.find_class("android/app/NotificationChannel")?;
            let id = env.new_string(&options.channel_id)?;
            let name = env.new_string(&options.channel_name)?;
            // NotificationManager.IMPORTANCE_DEFAULT
            let channel = env.new_object(
                channel_class,
                "(Ljava/lang/String;Ljava/lang/CharSequence;I)V",
                &[JValue::Object(&id), JValue::Object(&name), JValue::Int(3)],
            )?;

            if let Some(sound) = &options.channel_sound {
                let package = env
                    .call_method(context, "getPackageName", "()Ljava/lang/String;", &[])?
                    .l()?;
                let package: String = env.get_string(&JString::from(package))?.into();
                let resources = env
                    .call_method(
                        context,
                        "getResources",
                        "()Landroid/content/res/Resources;",
                        &[],
                    )?
                    .l()?;
                let sound_name = env.new_string(sound)?;
                let kind = env.new_string("raw")?;
                let package_str = env.new_string(&package)?;
                let resource_id = env
                    .call_method(
                        &resources,
                        "getIdentifier",
                        "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;)I",
                        &[
                            JValue::Object(&sound_name),
                            JValue::Object(&kind),
                            JValue::Object(&package_str),
                        ],
                    )?
                    .i()?;
                if resource_id != 0 {
                    let uri_text =
                        env.new_string(format!("android.resource://{package}/{resource_id}"))?;
                    let uri_class = env.find_class("android/net/Uri")?;
                    let uri = env
                        .call_static_method(
                            uri_class,
                            "parse",
                            "(Ljava/lang/String;)Landroid/net/Uri;",
                            &[JValue::Object(&uri_text)],
                        )?
                        .l()?;
                    env.call_method(
                        &channel,
                        "setSound",
                        "(Landroid/net/Uri;Landroid/media/AudioAttributes;)V",
                        &[JValue::Object(&uri), JValue::Object(&JObject::null())],
                    )?;
                }
            }

            let manager = Self::notification_manager(env, context)?;
            env.call_method(
                &manager,
                "createNotificationChannel",
                "(Landroid/app/NotificationChannel;)V",
                &[JValue::Object(&channel)],
            )?;
            Ok(())
        });
        if let Err(error) = result {
            tracing::warn!(%error, "default notification channel creation failed");
        }
    }

    fn instance_token() -> Result<Option<String>, String> {
        with_jni(|env, _context| {
            let class = env.find_class(FIREBASE_INSTANCE_ID_CLASS)?;
            let instance = env
                .call_static_method(
                    class,
                    "getInstance",
                    "()Lcom/google/firebase/iid/FirebaseInstanceId;",
                    &[],
                )?
                .l()?;
            let token = env
                .call_method(&instance, "getToken", "()Ljava/lang/String;", &[])?
                .l()?;
            if token.is_null() {
                Ok(None)
            } else {
                let token: String = env.get_string(&JString::from(token))?.into();
                Ok(if token.is_empty() { None } else { Some(token) })
            }
        })
    }

    fn delete_instance() -> Result<(), String> {
        with_jni(|env, _context| {
            let class = env.find_class(FIREBASE_INSTANCE_ID_CLASS)?;
            let instance = env
                .call_static_method(
                    class,
                    "getInstance",
                    "()Lcom/google/firebase/iid/FirebaseInstanceId;",
                    &[],
                )?
                .l()?;
            env.call_method(&instance, "deleteInstanceId", "()V", &[])?;
            Ok(())
        })
    }
}

impl PushBackend for AndroidBackend {
    fn register(
        &self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_channel();
            match Self::instance_token() {
                // No token generated yet; the messaging service delivers it
                // through the rotation callback when it materializes.
                Ok(token) => Ok(token),
                Err(error) => Err(PushError::RegistrationFailed(error)),
            }
        })
    }

    fn unregister(&self) -> Pin<Box<dyn Future<Output = PushResult<()>> + Send + '_>> {
        Box::pin(async move {
            Self::delete_instance().map_err(PushError::UnregistrationFailed)
        })
    }

    fn normalize(&self, payload: &Value) -> NotificationPayload {
        NotificationPayload::from_flat(payload)
    }

    fn list_delivered(
        &self,
    ) -> Pin<Box<dyn Future<Output = PushResult<Vec<DeliveredNotification>>> + Send + '_>> {
        Box::pin(async move {
            let delivered = with_jni(|env, context| {
                let manager = Self::notification_manager(env, context)?;
                let active = env
                    .call_method(
                        &manager,
                        "getActiveNotifications",
                        "()[Landroid/service/notification/StatusBarNotification;",
                        &[],
                    )?
                    .l()?;
                let active = JObjectArray::from(active);
                let count = env.get_array_length(&active)?;

                let mut delivered = Vec::with_capacity(count as usize);
                for index in 0..count {
                    let entry = env.get_object_array_element(&active, index)?;
                    let id = env.call_method(&entry, "getId", "()I", &[])?.i()?;
                    let tag_obj = env
                        .call_method(&entry, "getTag", "()Ljava/lang/String;", &[])?
                        .l()?;
                    let tag = java_to_string(env, &tag_obj)?.unwrap_or_default();
                    let notification = env
                        .call_method(
                            &entry,
                            "getNotification",
                            "()Landroid/app/Notification;",
                            &[],
                        )?
                        .l()?;
                    let extras = env
                        .get_field(&notification, "extras", "Landroid/os/Bundle;")?
                        .l()?;

                    let mut attributes: Vec<(String, String)> = Vec::new();
                    if !extras.is_null() {
                        let keys = env
                            .call_method(&extras, "keySet", "()Ljava/util/Set;", &[])?
                            .l()?;
                        let iterator = env
                            .call_method(&keys, "iterator", "()Ljava/util/Iterator;", &[])?
                            .l()?;
                        while env.call_method(&iterator, "hasNext", "()Z", &[])?.z()? {
                            let key_obj = env
                                .call_method(&iterator, "next", "()Ljava/lang/Object;", &[])?
                                .l()?;
                            let Some(key) = java_to_string(env, &key_obj)? else {
                                continue;
                            };
                            let value_obj = env
                                .call_method(
                                    &extras,
                                    "get",
                                    "(Ljava/lang/String;)Ljava/lang/Object;",
                                    &[JValue::Object(&JString::from(key_obj))],
                                )?
                                .l()?;
                            if let Some(value) = java_to_string(env, &value_obj)? {
                                attributes.push((key, value));
                            }
                        }
                    }

                    // Native id carries tag and id together; the tab cannot
                    // appear in an Android notification tag.
                    delivered.push(DeliveredNotification::new(
                        format!("{tag}\t{id}"),
                        NotificationPayload::from_attributes(attributes),
                    ));
                }
                Ok(delivered)
            });

            match delivered {
                Ok(delivered) => Ok(delivered),
                Err(error) => {
                    tracing::warn!(%error, "active notification listing failed");
                    Ok(Vec::new())
                }
            }
        })
    }

    fn remove_delivered(&self, native_ids: &[String]) -> PushResult<()> {
        for native_id in native_ids {
            let Some((tag, id)) = native_id.rsplit_once('\t') else {
                continue;
            };
            let Ok(id) = id.parse::<i32>() else { continue };
            let tag = tag.to_string();
            let result = with_jni(|env, context| {
                let manager = Self::notification_manager(env, context)?;
                if tag.is_empty() {
                    env.call_method(&manager, "cancel", "(I)V", &[JValue::Int(id)])?;
                } else {
                    let tag = env.new_string(&tag)?;
                    env.call_method(
                        &manager,
                        "cancel",
                        "(Ljava/lang/String;I)V",
                        &[JValue::Object(&tag), JValue::Int(id)],
                    )?;
                }
                Ok(())
            });
            if let Err(error) = result {
                tracing::warn!(%error, "notification cancel failed");
            }
        }
        Ok(())
    }

    fn remove_all_delivered(&self) -> PushResult<()> {
        let result = with_jni(|env, context| {
            let manager = Self::notification_manager(env, context)?;
            env.call_method(&manager, "cancelAll", "()V", &[])?;
            Ok(())
        });
        if let Err(error) = result {
            tracing::warn!(%error, "cancel-all failed");
        }
        Ok(())
    }

    fn set_categories(&self, categories: &[NotificationUserCategory]) -> PushResult<()> {
        // Android actions are attached per notification when it is built;
        // the cross-platform cache is the registration.
        tracing::debug!(count = categories.len(), "categories cached (no Android representation)");
        Ok(())
    }

    fn current_identity(&self) -> Option<AppIdentitySnapshot> {
        let identity = with_jni(|env, context| {
            let package = env
                .call_method(context, "getPackageName", "()Ljava/lang/String;", &[])?
                .l()?;
            let package: String = env.get_string(&JString::from(package))?.into();
            let manager = env
                .call_method(
                    context,
                    "getPackageManager",
                    "()Landroid/content/pm/PackageManager;",
                    &[],
                )?
                .l()?;
            let package_str = env.new_string(&package)?;
            let info = env
                .call_method(
                    &manager,
                    "getPackageInfo",
                    "(Ljava/lang/String;I)Landroid/content/pm/PackageInfo;",
                    &[JValue::Object(&package_str), JValue::Int(0)],
                )?
                .l()?;
            let version_name_obj = env
                .get_field(&info, "versionName", "Ljava/lang/String;")?
                .l()?;
            let version_name = java_to_string(env, &version_name_obj)?.unwrap_or_default();
            let version_code = env.get_field(&info, "versionCode", "I")?.i()?;
            Ok(AppIdentitySnapshot::new(
                package,
                version_name,
                version_code.to_string(),
            ))
        });
        match identity {
            Ok(identity) => Some(identity),
            Err(error) => {
                tracing::warn!(%error, "package identity lookup failed");
                None
            }
        }
    }
}
