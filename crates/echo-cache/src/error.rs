// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exchange lifecycle errors.

use echo_cache_core::SnapshotError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while seeding or persisting an exchange.
///
/// Per-operation failures never surface here; they travel in
/// [`crate::OperationResult::error`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// Config storage failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Snapshot was rejected.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
