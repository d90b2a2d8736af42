// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transport port.

use std::future::Future;
use std::sync::Arc;

use echo_cache_core::Operation;

use crate::result::OperationResult;

/// Performs the remote fetch for operations the cache cannot answer.
///
/// Implementations report failures through [`OperationResult::error`]; the
/// cache never retries.
pub trait Transport: Send + Sync {
    /// Sends `op` to the data source and resolves with its result.
    fn forward(&self, op: &Operation) -> impl Future<Output = OperationResult> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn forward(&self, op: &Operation) -> impl Future<Output = OperationResult> + Send {
        (**self).forward(op)
    }
}
