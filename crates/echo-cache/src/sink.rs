// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Redelivery sinks.

use std::sync::Arc;

use echo_cache_core::Operation;
use tokio::sync::mpsc;
use tracing::warn;

use crate::result::OperationResult;

/// A previously served operation whose dependencies changed.
#[derive(Debug, Clone)]
pub struct Redelivery {
    /// The affected operation.
    pub operation: Operation,
    /// Fresh result read from the store, or `None` when the re-read missed
    /// and the host should execute the operation again.
    pub result: Option<OperationResult>,
}

impl Redelivery {
    /// Returns `true` if the host must re-execute the operation.
    pub fn needs_reexecution(&self) -> bool {
        self.result.is_none()
    }
}

/// Receives redeliveries. Called outside the cache lock.
pub trait RedeliverySink: Send + Sync {
    /// Handles one redelivery.
    fn redeliver(&self, redelivery: Redelivery);
}

impl<S: RedeliverySink> RedeliverySink for Arc<S> {
    fn redeliver(&self, redelivery: Redelivery) {
        (**self).redeliver(redelivery);
    }
}

/// Forwards redeliveries into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Redelivery>,
}

impl ChannelSink {
    /// Creates a sink and the receiver it feeds.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Redelivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RedeliverySink for ChannelSink {
    fn redeliver(&self, redelivery: Redelivery) {
        let key = redelivery.operation.key();
        if self.tx.send(redelivery).is_err() {
            warn!(op = %key.short(), "redelivery receiver dropped");
        }
    }
}
