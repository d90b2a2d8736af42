// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation results.

use std::fmt;
use std::sync::Arc;

use echo_cache_core::OperationKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a result was served from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    /// Assembled entirely from the store.
    Hit,
    /// Produced by the transport.
    Miss,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => f.write_str("hit"),
            Self::Miss => f.write_str("miss"),
        }
    }
}

/// Result metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultMeta {
    /// Hit or miss.
    pub cache_outcome: CacheOutcome,
}

/// Outcome of executing (or redelivering) one operation.
///
/// `error` is opaque to the cache: it is produced by the transport and
/// passed through untouched.
#[derive(Debug, Clone)]
pub struct OperationResult {
    /// Operation this result answers.
    pub operation_key: OperationKey,
    /// Payload, if any.
    pub data: Option<Value>,
    /// Transport failure, if any.
    pub error: Option<Arc<anyhow::Error>>,
    /// Cache metadata.
    pub meta: ResultMeta,
}

impl OperationResult {
    /// A result served from the store.
    pub fn hit(operation_key: OperationKey, data: Value) -> Self {
        Self {
            operation_key,
            data: Some(data),
            error: None,
            meta: ResultMeta {
                cache_outcome: CacheOutcome::Hit,
            },
        }
    }

    /// A successful transport result.
    pub fn data(operation_key: OperationKey, data: Value) -> Self {
        Self {
            operation_key,
            data: Some(data),
            error: None,
            meta: ResultMeta {
                cache_outcome: CacheOutcome::Miss,
            },
        }
    }

    /// A failed transport result.
    pub fn error(operation_key: OperationKey, error: anyhow::Error) -> Self {
        Self {
            operation_key,
            data: None,
            error: Some(Arc::new(error)),
            meta: ResultMeta {
                cache_outcome: CacheOutcome::Miss,
            },
        }
    }

    /// Rebinds the result to `operation_key`.
    pub fn with_key(mut self, operation_key: OperationKey) -> Self {
        self.operation_key = operation_key;
        self
    }

    /// Overrides the cache outcome.
    pub fn with_outcome(mut self, cache_outcome: CacheOutcome) -> Self {
        self.meta.cache_outcome = cache_outcome;
        self
    }

    /// Hit or miss.
    pub fn cache_outcome(&self) -> CacheOutcome {
        self.meta.cache_outcome
    }

    /// Returns `true` if the transport reported a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
