// User notification category cache

use parking_lot::Mutex;

use super::NotificationUserCategory;

/// Holds the set of user-defined notification action categories currently
/// registered with the OS.
///
/// Every registration replaces the whole cached set - clear then insert, no
/// incremental diffing. Duplicate category ids are not rejected; the list is
/// kept exactly as supplied.
#[derive(Default)]
pub struct CategoryRegistry {
    categories: Mutex<Vec<NotificationUserCategory>>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the cached set. An empty input clears the cache.
    pub fn replace(&self, categories: &[NotificationUserCategory]) {
        let mut cached = self.categories.lock();
        cached.clear();
        cached.extend_from_slice(categories);
        tracing::debug!(count = cached.len(), "notification categories replaced");
    }

    pub fn clear(&self) {
        self.categories.lock().clear();
    }

    /// Order-preserving copy of the current cached set.
    pub fn list(&self) -> Vec<NotificationUserCategory> {
        self.categories.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.lock().is_empty()
    }
}
