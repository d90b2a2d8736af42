// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recording redelivery sink.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use echo_cache::{Redelivery, RedeliverySink};
use echo_cache_core::OperationKey;

/// Sink that keeps every redelivery in arrival order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    received: Arc<Mutex<Vec<Redelivery>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of everything received so far.
    pub fn redeliveries(&self) -> Vec<Redelivery> {
        self.lock().clone()
    }

    /// Redeliveries for `key` only.
    pub fn for_operation(&self, key: &OperationKey) -> Vec<Redelivery> {
        self.lock()
            .iter()
            .filter(|r| r.operation.key() == *key)
            .cloned()
            .collect()
    }

    /// Number of redeliveries received.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes and returns everything received so far.
    pub fn take(&self) -> Vec<Redelivery> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Redelivery>> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RedeliverySink for RecordingSink {
    fn redeliver(&self, redelivery: Redelivery) {
        self.lock().push(redelivery);
    }
}
