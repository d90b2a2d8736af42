// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exchange counters.

use serde::Serialize;

/// Monotonic counters for one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Queries answered from the store.
    pub hits: u64,
    /// Queries the store could not answer.
    pub misses: u64,
    /// Operations sent to the transport.
    pub forwards: u64,
    /// Redeliveries carrying a fresh result.
    pub redeliveries: u64,
    /// Redeliveries asking the host to re-execute.
    pub reforwards: u64,
    /// Speculative layers applied.
    pub optimistic_writes: u64,
    /// Speculative layers discarded without an authoritative result.
    pub rollbacks: u64,
    /// Transport results without data.
    pub transport_failures: u64,
}
