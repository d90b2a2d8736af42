// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Store snapshots.
//!
//! A snapshot is an owned copy of the base tables (optimistic layers are never
//! included). It serializes as
//!
//! ```text
//! { "format": 1,
//!   "records": { "<EntityKey>": { "<field>": <value>, ... }, ... },
//!   "links":   { "<LinkKey>": null | "<EntityKey>" | [ ... ], ... } }
//! ```
//!
//! Determinism contract
//! - `state_hash` is a BLAKE3 digest (prefix `b"snapshot:"`) over the tables
//!   in ascending key order; record fields are visited in ascending name
//!   order and values are hashed as canonical JSON.
//! - All lengths are 8-byte little-endian.
use std::collections::BTreeMap;

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::{write_canonical, EntityKey, Hash, LinkKey};
use crate::record::{Entity, Link};

/// Current snapshot encoding version.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Errors raised while encoding or decoding a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot was written by an incompatible encoder.
    #[error("unsupported snapshot format {found} (expected {})", SNAPSHOT_FORMAT)]
    UnsupportedFormat {
        /// Version found in the input.
        found: u32,
    },
    /// JSON encoding or decoding failed.
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Owned copy of the store's base tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Encoding version; see [`SNAPSHOT_FORMAT`].
    pub format: u32,
    /// Entity table.
    pub records: BTreeMap<EntityKey, Entity>,
    /// Link table.
    pub links: BTreeMap<LinkKey, Link>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            records: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }
}

impl Snapshot {
    /// Encodes the snapshot as JSON bytes.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Json`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes and version-checks a snapshot.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Json`] for malformed input and
    /// [`SnapshotError::UnsupportedFormat`] for a foreign version.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Checks the encoding version.
    ///
    /// # Errors
    /// Returns [`SnapshotError::UnsupportedFormat`] for a foreign version.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.format == SNAPSHOT_FORMAT {
            Ok(())
        } else {
            Err(SnapshotError::UnsupportedFormat { found: self.format })
        }
    }

    /// Canonical digest of the tables.
    pub fn state_hash(&self) -> Hash {
        let mut hasher = Hasher::new();
        hasher.update(b"snapshot:");
        hasher.update(&(self.records.len() as u64).to_le_bytes());
        for (key, entity) in &self.records {
            hash_str(&mut hasher, key.as_str());
            hasher.update(&(entity.len() as u64).to_le_bytes());
            for (field, value) in entity.fields() {
                hash_str(&mut hasher, field);
                let mut text = String::new();
                write_canonical(value, &mut text);
                hash_str(&mut hasher, &text);
            }
        }
        hasher.update(&(self.links.len() as u64).to_le_bytes());
        for (key, link) in &self.links {
            hash_str(&mut hasher, key.as_str());
            hash_link(&mut hasher, link);
        }
        hasher.finalize().into()
    }

    /// Returns `true` if both tables are empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.links.is_empty()
    }
}

fn hash_link(hasher: &mut Hasher, link: &Link) {
    match link {
        Link::Null => {
            hasher.update(&[0]);
        }
        Link::Key(key) => {
            hasher.update(&[1]);
            hash_str(hasher, key.as_str());
        }
        Link::List(items) => {
            hasher.update(&[2]);
            hasher.update(&(items.len() as u64).to_le_bytes());
            for item in items {
                hash_link(hasher, item);
            }
        }
    }
}

fn hash_str(hasher: &mut Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
