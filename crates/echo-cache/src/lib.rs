// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-cache: normalized, dependency-tracking query cache.
//!
//! [`CacheExchange`] sits between a query-issuing host and a [`Transport`].
//! It answers queries from the normalized store when it can, forwards them
//! when it cannot, and after every write hands fresh results for affected
//! queries to a [`RedeliverySink`]. Mutations with a registered speculative
//! resolver are applied to an optimistic layer first and reconciled when the
//! authoritative result arrives.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Cache configuration and the config storage port.
pub mod config;
mod error;
mod exchange;
mod optimistic;
mod result;
mod sink;
mod stats;
mod transport;

pub use config::{CacheConfig, ConfigError, ConfigService, ConfigStore, StaleReadPolicy};
pub use error::CacheError;
pub use exchange::{CacheExchange, CacheExchangeBuilder};
pub use optimistic::{OptimisticFn, OptimisticResolvers};
pub use result::{CacheOutcome, OperationResult, ResultMeta};
pub use sink::{ChannelSink, Redelivery, RedeliverySink};
pub use stats::CacheStats;
pub use transport::Transport;
