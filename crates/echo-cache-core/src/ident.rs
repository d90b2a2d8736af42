// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and key-derivation utilities.
//!
//! Every key the store hands out is a plain string with a fixed, documented
//! derivation:
//!
//! ```text
//! EntityKey   <TypeName>:<id>            e.g. Author:123
//! root record <RootType>                 e.g. Query
//! field key   <name>                     e.g. author
//!             <name>(<canonical args>)   e.g. authors({"first":10,"order":"asc"})
//! LinkKey     <field key>                at the document root
//!             <EntityKey>.<field key>    everywhere else
//! ```
//!
//! Canonical arguments are compact JSON with object keys sorted recursively,
//! so two argument maps that differ only in insertion order produce the same
//! key.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 256-bit BLAKE3 digest used for operation identities.
pub type Hash = [u8; 32];

/// Type names whose records belong to an operation root rather than to graph data.
pub const ROOT_TYPES: [&str; 3] = ["Query", "Mutation", "Subscription"];

/// Canonical identity of one graph object (`<TypeName>:<id>`).
///
/// Root records (`Query`, `Mutation`, `Subscription`) are also addressed by
/// an `EntityKey`, but they are operation-scoped bookkeeping: the store never
/// records them as touched, so they never take part in invalidation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Builds the key for an object of `typename` identified by `id`.
    pub fn new(typename: &str, id: &str) -> Self {
        Self(format!("{typename}:{id}"))
    }

    /// Builds the key of a root record (e.g. `Query`).
    pub fn root(typename: &str) -> Self {
        Self(typename.to_owned())
    }

    /// Wraps an already-derived key string (e.g. one read back from a snapshot).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for operation-scoped root records.
    pub fn is_root(&self) -> bool {
        ROOT_TYPES.contains(&self.0.as_str())
    }

    /// Returns the type-name prefix of the key.
    pub fn typename(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(ty, _)| ty)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one link slot: a (parent, field, arguments) occurrence.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkKey(String);

impl LinkKey {
    /// Derives the slot key for `field_key` on `parent`.
    ///
    /// Root parents contribute nothing to the key, so root fields are keyed
    /// by their field key alone.
    pub fn new(parent: &EntityKey, field_key: &str) -> Self {
        if parent.is_root() {
            Self(field_key.to_owned())
        } else {
            Self(format!("{parent}.{field_key}"))
        }
    }

    /// Wraps an already-derived key string.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identity of an operation (selection tree + variables).
///
/// Produced by [`crate::Operation::new`]; structurally identical operations
/// share an identity. `Display` renders lowercase hex.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct OperationKey(pub Hash);

impl OperationKey {
    /// Returns the canonical byte representation of this key.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Returns the first eight hex digits, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Identifier of one optimistic layer (one mutation invocation).
///
/// Zero is never issued by the store.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct LayerId(u64);

impl LayerId {
    /// Constructs a `LayerId` from a raw value.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives the store key of a field from its name and resolved arguments.
pub fn field_key(name: &str, args: &Map<String, Value>) -> String {
    if args.is_empty() {
        return name.to_owned();
    }
    let mut out = String::with_capacity(name.len() + 16);
    out.push_str(name);
    out.push('(');
    write_canonical_map(args, &mut out);
    out.push(')');
    out
}

/// Appends the canonical JSON text of `value` to `out`.
///
/// Object keys are sorted at every depth; arrays keep their order.
pub fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_map(map, out),
        Value::Array(items) => {
            out.push('[');
            for (ix, item) in items.iter().enumerate() {
                if ix > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_canonical_map(map: &Map<String, Value>, out: &mut String) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    out.push('{');
    for (ix, (name, value)) in entries.into_iter().enumerate() {
        if ix > 0 {
            out.push(',');
        }
        out.push_str(&Value::from(name.as_str()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}
