// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-traversal touch logs.
use std::collections::{BTreeSet, HashSet};

use crate::ident::{EntityKey, LinkKey};

/// A key in either store table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreKey {
    /// Entity table key.
    Entity(EntityKey),
    /// Link table key.
    Link(LinkKey),
}

impl StoreKey {
    /// Returns the entity key, if this is one.
    pub fn as_entity(&self) -> Option<&EntityKey> {
        match self {
            Self::Entity(key) => Some(key),
            Self::Link(_) => None,
        }
    }
}

/// Accumulates the keys one traversal accessed.
///
/// Deduplicated; keeps first-touch order.
#[derive(Debug, Default)]
pub struct TouchLog {
    order: Vec<StoreKey>,
    seen: HashSet<StoreKey>,
}

impl TouchLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` unless it was already recorded.
    pub fn record(&mut self, key: StoreKey) {
        if self.seen.insert(key.clone()) {
            self.order.push(key);
        }
    }

    /// Takes the recorded keys and resets the log.
    pub fn drain(&mut self) -> Touched {
        self.seen.clear();
        Touched(std::mem::take(&mut self.order))
    }

    /// Returns `true` if nothing was recorded since the last drain.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Drained, first-touch-ordered key list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Touched(Vec<StoreKey>);

impl Touched {
    /// Builds a list from `keys`, dropping duplicates.
    pub fn from_keys(keys: impl IntoIterator<Item = StoreKey>) -> Self {
        let mut log = TouchLog::new();
        for key in keys {
            log.record(key);
        }
        log.drain()
    }

    /// All keys in first-touch order.
    pub fn keys(&self) -> &[StoreKey] {
        &self.0
    }

    /// Entity keys only, in first-touch order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityKey> {
        self.0.iter().filter_map(StoreKey::as_entity)
    }

    /// Entity keys as an ordered set.
    pub fn entity_set(&self) -> BTreeSet<EntityKey> {
        self.entities().cloned().collect()
    }

    /// Appends the keys of `other` not already present.
    pub fn extend(&mut self, other: &Self) {
        let mut seen: HashSet<StoreKey> = self.0.iter().cloned().collect();
        for key in &other.0 {
            if seen.insert(key.clone()) {
                self.0.push(key.clone());
            }
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no key was touched.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
