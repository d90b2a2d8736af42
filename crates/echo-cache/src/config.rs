// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache configuration and the config storage port.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Logical key under which [`CacheConfig`] is stored.
pub const CONFIG_KEY: &str = "echo-cache";

/// What to do when a dependent's re-read misses during redelivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReadPolicy {
    /// Hand the operation back to the host with no result so it re-executes.
    #[default]
    Reforward,
    /// Skip the dependent; it keeps its last delivered result.
    Drop,
}

/// Tunables for a cache exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Apply speculative mutation results before the response arrives.
    pub optimistic: bool,
    /// Emit redeliveries for dependents of each write.
    pub redelivery: bool,
    /// Handling of dependents whose re-read misses.
    pub stale_read_policy: StaleReadPolicy,
    /// Config-store key for persisted snapshots.
    pub snapshot_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            optimistic: true,
            redelivery: true,
            stale_read_policy: StaleReadPolicy::Reforward,
            snapshot_key: "echo-cache-snapshot".to_owned(),
        }
    }
}

impl CacheConfig {
    /// Loads the config stored under [`CONFIG_KEY`], or the default when none is stored.
    ///
    /// # Errors
    /// Propagates storage and decoding failures.
    pub fn load_or_default<S: ConfigStore>(service: &ConfigService<S>) -> Result<Self, ConfigError> {
        Ok(service.load(CONFIG_KEY)?.unwrap_or_default())
    }

    /// Stores this config under [`CONFIG_KEY`].
    ///
    /// # Errors
    /// Propagates storage and encoding failures.
    pub fn save<S: ConfigStore>(&self, service: &ConfigService<S>) -> Result<(), ConfigError> {
        service.save(CONFIG_KEY, self)
    }
}

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Serializes values as JSON and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the inner store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize the value for `key`. Returns `Ok(None)` if missing.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist the value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}
