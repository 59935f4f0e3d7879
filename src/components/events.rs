// Process-wide multicast event hub
//
// One shared dispatch point per event kind so any part of the app can
// subscribe without holding a reference to the adapter that fires the event.
// The hub is created by the facade at initialize time, shared via `Arc`, and
// never implicitly torn down.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::payload::{NotificationPayload, NotificationResponse};
use super::PushError;

/// The five cross-platform event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TokenRefresh,
    NotificationReceived,
    NotificationDeleted,
    NotificationOpened,
    Error,
}

/// Handle returned by the subscribe methods; pass back to
/// [`EventHub::unsubscribe`] to detach the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// One ordered multicast list. Callbacks are invoked synchronously on the
/// emitting context, in subscription order.
struct Multicast<T: ?Sized> {
    subscribers: Mutex<Vec<(u64, Arc<dyn Fn(&T) + Send + Sync>)>>,
}

impl<T: ?Sized> Multicast<T> {
    fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, id: u64, callback: Arc<dyn Fn(&T) + Send + Sync>) -> usize {
        let mut subscribers = self.subscribers.lock();
        let previous = subscribers.len();
        subscribers.push((id, callback));
        previous
    }

    fn remove(&self, id: u64) {
        self.subscribers.lock().retain(|(sub_id, _)| *sub_id != id);
    }

    fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn emit(&self, value: &T) {
        // Snapshot under the lock, invoke outside it, so a callback may
        // subscribe or unsubscribe without deadlocking.
        let snapshot: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(value);
        }
    }
}

/// Multicast hub for the cross-platform push events.
///
/// Every event supports multiple subscribers added and removed
/// independently. Missing subscribers silently drop the event, with one
/// exception: a notification-opened response that fires with zero
/// subscribers is kept as the single pending response and replayed to the
/// first subscriber that attaches.
pub struct EventHub {
    next_id: AtomicU64,
    token_refresh: Multicast<str>,
    received: Multicast<NotificationPayload>,
    deleted: Multicast<NotificationPayload>,
    opened: Multicast<NotificationResponse>,
    error: Multicast<PushError>,
    pending_opened: Mutex<Option<NotificationResponse>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            token_refresh: Multicast::new(),
            received: Multicast::new(),
            deleted: Multicast::new(),
            opened: Multicast::new(),
            error: Multicast::new(),
            pending_opened: Mutex::new(None),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn on_token_refresh(
        &self,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.token_refresh.add(id, Arc::new(callback));
        Subscription {
            kind: EventKind::TokenRefresh,
            id,
        }
    }

    pub fn on_notification_received(
        &self,
        callback: impl Fn(&NotificationPayload) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.received.add(id, Arc::new(callback));
        Subscription {
            kind: EventKind::NotificationReceived,
            id,
        }
    }

    pub fn on_notification_deleted(
        &self,
        callback: impl Fn(&NotificationPayload) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.deleted.add(id, Arc::new(callback));
        Subscription {
            kind: EventKind::NotificationDeleted,
            id,
        }
    }

    /// Subscribe to notification-opened responses. When a pending response
    /// is buffered and this is the first subscriber, the response is
    /// replayed to it immediately and the buffer is cleared.
    pub fn on_notification_opened(
        &self,
        callback: impl Fn(&NotificationResponse) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        let callback: Arc<dyn Fn(&NotificationResponse) + Send + Sync> = Arc::new(callback);
        let previous = self.opened.add(id, Arc::clone(&callback));
        if previous == 0 {
            if let Some(pending) = self.pending_opened.lock().take() {
                tracing::debug!(action = %pending.identifier, "replaying pending opened response");
                callback(&pending);
            }
        }
        Subscription {
            kind: EventKind::NotificationOpened,
            id,
        }
    }

    pub fn on_error(
        &self,
        callback: impl Fn(&PushError) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        self.error.add(id, Arc::new(callback));
        Subscription {
            kind: EventKind::Error,
            id,
        }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        match subscription.kind {
            EventKind::TokenRefresh => self.token_refresh.remove(subscription.id),
            EventKind::NotificationReceived => self.received.remove(subscription.id),
            EventKind::NotificationDeleted => self.deleted.remove(subscription.id),
            EventKind::NotificationOpened => self.opened.remove(subscription.id),
            EventKind::Error => self.error.remove(subscription.id),
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::TokenRefresh => self.token_refresh.len(),
            EventKind::NotificationReceived => self.received.len(),
            EventKind::NotificationDeleted => self.deleted.len(),
            EventKind::NotificationOpened => self.opened.len(),
            EventKind::Error => self.error.len(),
        }
    }

    pub fn emit_token_refresh(&self, token: &str) {
        self.token_refresh.emit(token);
    }

    pub fn emit_notification_received(&self, payload: &NotificationPayload) {
        self.received.emit(payload);
    }

    pub fn emit_notification_deleted(&self, payload: &NotificationPayload) {
        self.deleted.emit(payload);
    }

    /// Dispatch an opened response, or buffer it when nobody is listening.
    /// A newer response replaces an older undelivered one; the slot holds at
    /// most a single response.
    pub fn emit_notification_opened(&self, response: &NotificationResponse) {
        if self.opened.len() == 0 {
            *self.pending_opened.lock() = Some(response.clone());
        } else {
            self.opened.emit(response);
        }
    }

    pub fn emit_error(&self, error: &PushError) {
        tracing::warn!(error = %error, "push error event");
        self.error.emit(error);
    }

    pub fn has_pending_opened(&self) -> bool {
        self.pending_opened.lock().is_some()
    }

    /// Seed the pending slot directly, without attempting dispatch. Used for
    /// launch-from-notification responses recorded before any subscriber can
    /// exist.
    pub(crate) fn buffer_opened(&self, response: NotificationResponse) {
        *self.pending_opened.lock() = Some(response);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
