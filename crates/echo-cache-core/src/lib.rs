// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-cache-core: normalized graph store and traversals.
//!
//! The core is synchronous and transport-agnostic. It normalizes query
//! payloads into a flat entity/link [`Store`], reads them back, records which
//! keys each traversal touched, and indexes which operations depend on which
//! entities. Deciding *when* to read, forward or redeliver lives in
//! `echo-cache`.
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

mod deps;
mod ident;
mod keys;
mod overlay;
mod record;
mod selection;
mod snapshot;
mod store;
mod touch;
mod traverse;

/// Dependency index.
pub use deps::DependencyIndex;
/// Keys and key canonicalization.
pub use ident::{
    field_key, write_canonical, EntityKey, Hash, LayerId, LinkKey, OperationKey, ROOT_TYPES,
};
/// Identification rules.
pub use keys::{default_id, KeyError, KeyFn, KeyRules, TYPENAME_FIELD};
/// Optimistic layers.
pub use overlay::{EntityDiff, OverlayLayer};
/// Store records.
pub use record::{Entity, Link};
/// Selection trees and operations.
pub use selection::{
    make_operation_key, ArgValue, Field, Operation, OperationKind, SelectionSet, Variables,
};
/// Snapshots.
pub use snapshot::{Snapshot, SnapshotError, SNAPSHOT_FORMAT};
/// Store and tracked handles.
pub use store::{Store, TrackedStore};
/// Touch logs.
pub use touch::{StoreKey, TouchLog, Touched};
/// Traversals.
pub use traverse::{read_operation, write_operation, ReadOutcome, WriteMode, WriteOutcome};
