// App install identity - package/version snapshot for token invalidation

use serde::{Deserialize, Serialize};

use super::token::KeyValueStore;

const PACKAGE_NAME_KEY: &str = "app.package_name";
const VERSION_NAME_KEY: &str = "app.version_name";
const VERSION_CODE_KEY: &str = "app.version_code";

/// Package name plus version identifiers, captured at each initialization.
///
/// A registration token is only valid for the install that requested it, so
/// the snapshot stored at the previous run is compared against the current
/// one; any mismatch (reinstall under another package, upgrade) forces the
/// stored token to be cleared before a new registration is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentitySnapshot {
    pub package_name: String,
    pub version_name: String,
    pub version_code: String,
}

impl AppIdentitySnapshot {
    pub fn new(
        package_name: impl Into<String>,
        version_name: impl Into<String>,
        version_code: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            version_name: version_name.into(),
            version_code: version_code.into(),
        }
    }

    /// Load the previously stored snapshot; fields absent from the store
    /// come back empty.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            package_name: store.get(PACKAGE_NAME_KEY).unwrap_or_default(),
            version_name: store.get(VERSION_NAME_KEY).unwrap_or_default(),
            version_code: store.get(VERSION_CODE_KEY).unwrap_or_default(),
        }
    }

    pub fn persist(&self, store: &dyn KeyValueStore) {
        store.set(PACKAGE_NAME_KEY, &self.package_name);
        store.set(VERSION_NAME_KEY, &self.version_name);
        store.set(VERSION_CODE_KEY, &self.version_code);
    }

    /// Whether the stored snapshot invalidates the current token.
    ///
    /// A snapshot that was never stored (empty package name) invalidates
    /// nothing; comparisons are case-insensitive.
    pub fn invalidates(&self, current: &Self) -> bool {
        !self.package_name.is_empty()
            && (!self.package_name.eq_ignore_ascii_case(&current.package_name)
                || !self.version_name.eq_ignore_ascii_case(&current.version_name)
                || !self.version_code.eq_ignore_ascii_case(&current.version_code))
    }
}
