// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use echo_cache::{ConfigError, ConfigStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory implementation of [`ConfigStore`] for testing.
///
/// Shares its contents between clones, so a test can hand one clone to a
/// `ConfigService` and inspect another. Tracks call counts for verification.
///
/// # Example
///
/// ```
/// use echo_cache::{CacheConfig, ConfigService};
/// use echo_cache_dry_tests::InMemoryConfigStore;
///
/// let store = InMemoryConfigStore::new();
/// let service = ConfigService::new(store.clone());
///
/// CacheConfig::default().save(&service).unwrap();
/// assert_eq!(store.load_count(), 0);
/// assert_eq!(store.save_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<InMemoryConfigStoreInner>>,
}

#[derive(Default)]
struct InMemoryConfigStoreInner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create a new empty in-memory config store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given key-value pairs.
    pub fn with_data(data: HashMap<String, Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InMemoryConfigStoreInner {
                data,
                ..Default::default()
            })),
        }
    }

    /// Configure the store to fail on load operations.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Configure the store to fail on save operations.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// Number of `load_raw` attempts, including failed ones.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// Number of `save_raw` attempts, including failed ones.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Raw bytes stored under `key`, without counting a load.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().data.get(key).cloned()
    }

    /// Check if a key exists in the store.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryConfigStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.lock();
        inner.load_count += 1;

        if inner.fail_on_load {
            return Err(ConfigError::Other("simulated load failure".into()));
        }

        inner.data.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.save_count += 1;

        if inner.fail_on_save {
            return Err(ConfigError::Other("simulated save failure".into()));
        }

        inner.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_save_load() {
        let store = InMemoryConfigStore::new();
        store.save_raw("test", b"hello").unwrap();
        let loaded = store.load_raw("test").unwrap();
        assert_eq!(loaded, b"hello");
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn load_missing_key_returns_not_found() {
        let store = InMemoryConfigStore::new();
        assert!(matches!(store.load_raw("missing"), Err(ConfigError::NotFound)));
    }

    #[test]
    fn failure_flags_surface_as_other() {
        let store = InMemoryConfigStore::new();
        store.save_raw("test", b"data").unwrap();
        store.set_fail_on_load(true);
        store.set_fail_on_save(true);
        assert!(matches!(store.load_raw("test"), Err(ConfigError::Other(_))));
        assert!(matches!(store.save_raw("test", b"x"), Err(ConfigError::Other(_))));
        assert_eq!(store.raw("test").unwrap(), b"data");
    }

    #[test]
    fn with_data_prepopulates_store() {
        let mut initial = HashMap::new();
        initial.insert("key1".to_string(), b"value1".to_vec());
        let store = InMemoryConfigStore::with_data(initial);
        assert!(store.contains_key("key1"));
        assert_eq!(store.save_count(), 0);
    }
}
