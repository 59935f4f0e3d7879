//! Cross-platform push notification facade.
//!
//! [`PushManager`] is the single entry point applications use: it owns the
//! event hub, the token store, and the category registry, and delegates the
//! native work to the platform adapter selected at compile time. Native
//! callbacks reach it through the `handle_*` ingestion methods, which host
//! glue forwards from the app delegate / service / channel handler.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::backends::{PushBackend, PushBackendFactory};
use crate::components::payload::normalize_action_identifier;
use crate::components::{
    AppIdentitySnapshot, CategoryRegistry, EventHub, ForegroundPresentation, KeyValueStore,
    NotificationCategoryType, NotificationPayload, NotificationResponse,
    NotificationUserCategory, PushError, PushResult, TokenStore,
};

/// Application-side observer invoked alongside the multicast events.
///
/// All methods default to no-ops; implement only what the app cares about.
/// Handlers run synchronously on the dispatching context and must not block.
pub trait NotificationHandler: Send + Sync {
    fn on_received(&self, _payload: &NotificationPayload) {}
    fn on_opened(&self, _response: &NotificationResponse) {}
    fn on_error(&self, _error: &PushError) {}
}

/// Pass-through handler installed when the app supplies none.
pub struct DefaultNotificationHandler;

impl NotificationHandler for DefaultNotificationHandler {}

/// Facade lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacadeState {
    Uninitialized,
    Initialized,
    Registered,
    Unregistered,
}

/// Options accepted by [`PushManager::initialize`]; the crate's whole
/// configuration surface.
pub struct InitOptions {
    /// Observer invoked alongside the events; defaults to a no-op handler.
    pub handler: Option<Arc<dyn NotificationHandler>>,
    /// Categories to register with the OS during initialization.
    pub categories: Vec<NotificationUserCategory>,
    /// Spawn the registration flow immediately. On by default.
    pub auto_register: bool,
    /// Force the stored token to be cleared before the next registration.
    pub reset_token: bool,
    /// The remote-notification payload the app was launched from, when the
    /// OS hands one over; replayed as a default-action opened response.
    pub launch_payload: Option<Value>,
    /// Buffer an opened response that fires before any subscriber attaches,
    /// replaying it to the first one. On by default.
    pub delayed_response: bool,
}

impl InitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: Arc<dyn NotificationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_categories(mut self, categories: Vec<NotificationUserCategory>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_auto_register(mut self, auto_register: bool) -> Self {
        self.auto_register = auto_register;
        self
    }

    pub fn with_reset_token(mut self, reset_token: bool) -> Self {
        self.reset_token = reset_token;
        self
    }

    pub fn with_launch_payload(mut self, payload: Value) -> Self {
        self.launch_payload = Some(payload);
        self
    }

    pub fn with_delayed_response(mut self, delayed_response: bool) -> Self {
        self.delayed_response = delayed_response;
        self
    }
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            handler: None,
            categories: Vec::new(),
            auto_register: true,
            reset_token: false,
            launch_payload: None,
            delayed_response: true,
        }
    }
}

struct Inner {
    backend: Option<Arc<dyn PushBackend>>,
    token_store: TokenStore,
    events: Arc<EventHub>,
    categories: CategoryRegistry,
    handler: Mutex<Arc<dyn NotificationHandler>>,
    state: Mutex<FacadeState>,
    reset_token: AtomicBool,
    delayed_response: AtomicBool,
}

/// The cross-platform push notification client.
///
/// Cheap to clone; clones share the same hub, stores, and adapter.
#[derive(Clone)]
pub struct PushManager {
    inner: Arc<Inner>,
}

impl PushManager {
    /// Manager over the platform adapter and store for the compile target.
    /// On targets without a push subsystem the manager still dispatches
    /// events but reports registration attempts as failures.
    pub fn native() -> Self {
        Self::build(PushBackendFactory::create(), PushBackendFactory::default_store())
    }

    /// Manager over an explicit adapter and store. The seam used by tests
    /// and by hosts that bring their own persistence.
    pub fn with_backend(backend: Arc<dyn PushBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::build(Some(backend), store)
    }

    fn build(backend: Option<Arc<dyn PushBackend>>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                token_store: TokenStore::new(store),
                events: Arc::new(EventHub::new()),
                categories: CategoryRegistry::new(),
                handler: Mutex::new(Arc::new(DefaultNotificationHandler)),
                state: Mutex::new(FacadeState::Uninitialized),
                reset_token: AtomicBool::new(false),
                delayed_response: AtomicBool::new(true),
            }),
        }
    }

    /// The event hub; subscribe before [`initialize`](Self::initialize) to
    /// observe the first registration attempt.
    pub fn events(&self) -> Arc<EventHub> {
        Arc::clone(&self.inner.events)
    }

    pub fn state(&self) -> FacadeState {
        *self.inner.state.lock()
    }

    /// The stored device token; empty until a registration succeeds.
    pub fn token(&self) -> String {
        self.inner.token_store.get()
    }

    /// Wire the handler, categories, and launch payload, then (unless
    /// suppressed) spawn the registration flow in the background.
    ///
    /// Must be called from within a tokio runtime when `auto_register` is
    /// left on.
    pub fn initialize(&self, options: InitOptions) {
        if let Some(handler) = options.handler {
            *self.inner.handler.lock() = handler;
        }
        self.inner
            .delayed_response
            .store(options.delayed_response, Ordering::Relaxed);
        self.inner
            .reset_token
            .store(options.reset_token, Ordering::Relaxed);

        if !options.categories.is_empty() {
            if let Err(error) = self.register_user_notification_categories(&options.categories) {
                tracing::warn!(error = %error, "category registration during initialize failed");
            }
        }

        if let Some(launch) = options.launch_payload {
            let payload = self.normalize(&launch);
            tracing::info!(keys = payload.len(), "app launched from push notification");
            self.dispatch_opened(NotificationResponse::new(
                payload,
                "",
                NotificationCategoryType::Default,
            ));
        }

        self.set_state(FacadeState::Initialized);

        if options.auto_register {
            self.register_for_push_notifications();
        }
    }

    /// Start a registration attempt on a background task; completes
    /// independently of the caller and raises Token-Refresh or Error
    /// exactly once per attempt.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register_for_push_notifications(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            manager.run_registration().await;
        });
    }

    async fn run_registration(&self) {
        let Some(backend) = self.inner.backend.clone() else {
            self.report_error(PushError::RegistrationFailed(
                "no push subsystem on this platform".to_string(),
            ));
            return;
        };

        // Install/upgrade detection, on platforms that bind tokens to the
        // installed package version.
        if let Some(current) = backend.current_identity() {
            let store = self.inner.token_store.backing();
            let stored = AppIdentitySnapshot::load(store.as_ref());
            let reset = self.inner.reset_token.swap(false, Ordering::Relaxed);
            if reset || stored.invalidates(&current) {
                tracing::info!(
                    package = %current.package_name,
                    reset,
                    "install identity changed, clearing stored token"
                );
                if let Err(error) = backend.unregister().await {
                    self.report_error(error);
                }
                self.inner.token_store.clear();
            }
            current.persist(store.as_ref());
        }

        match backend.register().await {
            Ok(Some(token)) => self.accept_token(&token),
            Ok(None) => {
                // Token arrives later through handle_device_token /
                // handle_token_refresh.
                tracing::debug!("native registration in flight, token delivery deferred");
            }
            Err(error) => self.report_error(error),
        }
    }

    /// Drop the native registration (best effort) and clear the stored
    /// token. Runs in the background; unregistration is locally complete
    /// even when the native side fails, since the local token cache is
    /// authoritative for the app's own state.
    pub fn unregister_for_push_notifications(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Some(backend) = manager.inner.backend.clone() {
                if let Err(error) = backend.unregister().await {
                    manager.report_error(error);
                }
            }
            manager.inner.token_store.clear();
            manager.set_state(FacadeState::Unregistered);
        });
    }

    /// Remove every delivered notification whose embedded id equals `id`,
    /// irrespective of tag.
    pub async fn remove_notification(&self, id: i64) -> PushResult<()> {
        self.remove_matching(None, id).await
    }

    /// Remove delivered notifications matching both `tag` and `id`. An
    /// empty tag degrades to removal by id alone.
    pub async fn remove_notification_with_tag(&self, tag: &str, id: i64) -> PushResult<()> {
        if tag.is_empty() {
            self.remove_matching(None, id).await
        } else {
            self.remove_matching(Some(tag), id).await
        }
    }

    async fn remove_matching(&self, tag: Option<&str>, id: i64) -> PushResult<()> {
        let Some(backend) = self.inner.backend.clone() else {
            return Ok(());
        };
        let delivered = backend.list_delivered().await?;
        let matches: Vec<String> = delivered
            .iter()
            .filter(|notification| notification.matches(tag, id))
            .map(|notification| notification.native_id.clone())
            .collect();
        tracing::debug!(id, ?tag, matched = matches.len(), "removing delivered notifications");
        if matches.is_empty() {
            return Ok(());
        }
        backend.remove_delivered(&matches)
    }

    /// Remove every currently delivered notification for the app.
    pub async fn clear_all_notifications(&self) -> PushResult<()> {
        match self.inner.backend.as_deref() {
            Some(backend) => backend.remove_all_delivered(),
            None => Ok(()),
        }
    }

    /// Replace the registered category set wholesale and forward it to the
    /// OS notification center. An empty slice clears the set.
    pub fn register_user_notification_categories(
        &self,
        categories: &[NotificationUserCategory],
    ) -> PushResult<()> {
        self.inner.categories.replace(categories);
        match self.inner.backend.as_deref() {
            Some(backend) => backend.set_categories(categories),
            None => Ok(()),
        }
    }

    /// Order-preserving copy of the currently registered categories.
    pub fn get_user_notification_categories(&self) -> Vec<NotificationUserCategory> {
        self.inner.categories.list()
    }

    // ------------------------------------------------------------------
    // Ingestion entry points, called by host glue from native callbacks.
    // ------------------------------------------------------------------

    /// An APNs device token as raw bytes; hex-encoded before storage.
    /// Empty token data is ignored.
    pub fn handle_device_token(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut token = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            let _ = write!(token, "{byte:02x}");
        }
        self.accept_token(&token);
    }

    /// A ready-made token string (FCM rotation callback, WNS channel URI).
    pub fn handle_token_refresh(&self, token: &str) {
        self.accept_token(token);
    }

    /// The native registration attempt failed after `register()` returned.
    pub fn handle_registration_failed(&self, diagnostic: &str) {
        self.report_error(PushError::RegistrationFailed(diagnostic.to_string()));
    }

    /// An incoming payload, while foregrounded or as a silent/data push.
    /// Always raises the received event; the returned presentation is what
    /// the host passes to the OS completion handler for this notification.
    pub fn handle_payload_received(&self, native: &Value) -> ForegroundPresentation {
        let payload = self.normalize(native);
        self.inner.events.emit_notification_received(&payload);
        self.handler().on_received(&payload);
        let presentation = ForegroundPresentation::for_payload(&payload);
        tracing::debug!(alert = presentation.alert, "payload received");
        presentation
    }

    /// The OS discarded pending messages for this app (FCM deleted-messages
    /// callback).
    pub fn handle_payload_deleted(&self, native: &Value) {
        let payload = self.normalize(native);
        self.inner.events.emit_notification_deleted(&payload);
    }

    /// The user tapped a delivered notification or one of its action
    /// buttons. The platform default-action identifier normalizes to the
    /// empty string.
    pub fn handle_notification_opened(
        &self,
        native: &Value,
        action_identifier: &str,
        category_type: NotificationCategoryType,
    ) {
        let payload = self.normalize(native);
        let response = NotificationResponse::new(
            payload,
            normalize_action_identifier(action_identifier),
            category_type,
        );
        self.dispatch_opened(response);
    }

    // ------------------------------------------------------------------

    fn dispatch_opened(&self, response: NotificationResponse) {
        let events = &self.inner.events;
        if self.inner.delayed_response.load(Ordering::Relaxed) {
            events.emit_notification_opened(&response);
        } else if events.subscriber_count(crate::components::EventKind::NotificationOpened) > 0 {
            events.emit_notification_opened(&response);
        }
        self.handler().on_opened(&response);
    }

    fn accept_token(&self, token: &str) {
        self.inner.token_store.set(token);
        self.inner.events.emit_token_refresh(token);
        self.set_state(FacadeState::Registered);
    }

    fn report_error(&self, error: PushError) {
        self.inner.events.emit_error(&error);
        self.handler().on_error(&error);
    }

    // Clone out of the lock so handlers never run with it held.
    fn handler(&self) -> Arc<dyn NotificationHandler> {
        self.inner.handler.lock().clone()
    }

    fn normalize(&self, native: &Value) -> NotificationPayload {
        match self.inner.backend.as_deref() {
            Some(backend) => backend.normalize(native),
            None => NotificationPayload::from_nested(native),
        }
    }

    fn set_state(&self, state: FacadeState) {
        let mut current = self.inner.state.lock();
        if *current != state {
            tracing::debug!(from = ?*current, to = ?state, "facade state transition");
            *current = state;
        }
    }
}
