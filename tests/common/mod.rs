//! Shared test fixtures: an in-process backend double and event collectors.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use native_push::{
    AppIdentitySnapshot, DeliveredNotification, MemoryStore, NotificationPayload,
    NotificationUserCategory, PushBackend, PushManager, PushResult,
};

/// Scriptable adapter standing in for a platform push subsystem.
#[derive(Default)]
pub struct TestBackend {
    pub register_result: Mutex<Option<PushResult<Option<String>>>>,
    pub unregister_result: Mutex<Option<PushResult<()>>>,
    pub delivered: Mutex<Vec<DeliveredNotification>>,
    pub identity: Mutex<Option<AppIdentitySnapshot>>,
    pub removed: Mutex<Vec<String>>,
    pub categories_seen: Mutex<Vec<Vec<NotificationUserCategory>>>,
    pub register_calls: AtomicUsize,
    pub unregister_calls: AtomicUsize,
    pub remove_all_calls: AtomicUsize,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let backend = Self::new();
        *backend.register_result.lock() = Some(Ok(Some(token.to_string())));
        backend
    }

    pub fn with_register_result(result: PushResult<Option<String>>) -> Self {
        let backend = Self::new();
        *backend.register_result.lock() = Some(result);
        backend
    }

    pub fn with_identity(self, identity: AppIdentitySnapshot) -> Self {
        *self.identity.lock() = Some(identity);
        self
    }

    pub fn with_delivered(self, delivered: Vec<DeliveredNotification>) -> Self {
        *self.delivered.lock() = delivered;
        self
    }
}

impl PushBackend for TestBackend {
    fn register(
        &self,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = PushResult<Option<String>>> + Send + '_>,
    > {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.register_result.lock().clone().unwrap_or(Ok(None));
        Box::pin(async move { result })
    }

    fn unregister(
        &self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = PushResult<()>> + Send + '_>> {
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.unregister_result.lock().clone().unwrap_or(Ok(()));
        Box::pin(async move { result })
    }

    fn normalize(&self, payload: &Value) -> NotificationPayload {
        NotificationPayload::from_nested(payload)
    }

    fn list_delivered(
        &self,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = PushResult<Vec<DeliveredNotification>>> + Send + '_>,
    > {
        let delivered = self.delivered.lock().clone();
        Box::pin(async move { Ok(delivered) })
    }

    fn remove_delivered(&self, native_ids: &[String]) -> PushResult<()> {
        self.removed.lock().extend_from_slice(native_ids);
        self.delivered
            .lock()
            .retain(|notification| !native_ids.contains(&notification.native_id));
        Ok(())
    }

    fn remove_all_delivered(&self) -> PushResult<()> {
        self.remove_all_calls.fetch_add(1, Ordering::SeqCst);
        self.delivered.lock().clear();
        Ok(())
    }

    fn set_categories(&self, categories: &[NotificationUserCategory]) -> PushResult<()> {
        self.categories_seen.lock().push(categories.to_vec());
        Ok(())
    }

    fn current_identity(&self) -> Option<AppIdentitySnapshot> {
        self.identity.lock().clone()
    }
}

/// Manager wired to a scripted backend and an in-memory store.
pub fn manager_with(backend: Arc<TestBackend>) -> PushManager {
    PushManager::with_backend(backend, Arc::new(MemoryStore::new()))
}

/// Await an eventually-true condition driven by a background task.
pub async fn wait_until(description: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for: {description}");
}

/// A delivered-notification entry whose user info carries the given id/tag
/// keys verbatim.
pub fn delivered_entry(native_id: &str, pairs: &[(&str, &str)]) -> DeliveredNotification {
    let data = NotificationPayload::from_attributes(
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
    );
    DeliveredNotification::new(native_id, data)
}
