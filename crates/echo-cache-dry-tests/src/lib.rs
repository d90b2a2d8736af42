// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for echo-cache crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`transport`] - Scripted transport with per-operation response gates
//! - [`sink`] - Redelivery sink that records everything it receives
//! - [`fixtures`] - The author/authors/user queries and the concealAuthor mutation
//! - [`logging`] - Test-writer tracing subscriber
#![forbid(unsafe_code)]

pub mod config;
pub mod fixtures;
pub mod logging;
pub mod sink;
pub mod transport;

pub use config::InMemoryConfigStore;
pub use logging::init_test_tracing;
pub use sink::RecordingSink;
pub use transport::ScriptedTransport;
