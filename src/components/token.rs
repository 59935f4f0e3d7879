// Token persistence over platform-local key-value storage

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Local persistent key-value storage contract.
///
/// Platform backends supply an implementation over the OS store
/// (`NSUserDefaults`, `SharedPreferences`, `ApplicationData.LocalSettings`);
/// hosts without one fall back to [`MemoryStore`]. Implementations must be
/// safe to call from a background execution context without blocking the
/// caller's main sequence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-process store used as the fallback and in tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

const TOKEN_KEY: &str = "push.token";

/// Persists the opaque device token under a fixed key.
///
/// Lifecycle: created on first successful registration, overwritten on
/// rotation, cleared on unregister. No encryption, no expiry - the token
/// lives until explicitly cleared or the OS wipes the backing store.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored token, or the empty string when none is stored.
    pub fn get(&self) -> String {
        self.store.get(TOKEN_KEY).unwrap_or_default()
    }

    pub fn set(&self, token: &str) {
        tracing::debug!(len = token.len(), "persisting device token");
        self.store.set(TOKEN_KEY, token);
    }

    /// Clearing is storing the empty string; a cleared store never reports
    /// a stale token alongside a deletion in flight.
    pub fn clear(&self) {
        self.set("");
    }

    /// The shared backing store, also used for the identity snapshot keys.
    pub fn backing(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }
}
