// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Store record types: entities and links.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ident::EntityKey;

/// Attribute bag for one entity.
///
/// Values are scalars, explicit `null`s, or embedded (unkeyable) objects.
/// The store owns every `Entity`; callers only ever receive copies, so a
/// bag obtained from a read can be inspected freely without affecting
/// the store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(BTreeMap<String, Value>);

impl Entity {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `field`, if any.
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Stores `value` under `field`, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Removes `field`; returns the previous value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Iterates fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no field is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Entity {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Reference stored in a link slot.
///
/// A slot that was never written is *absent* (the store returns `None`);
/// `Link::Null` is the known-empty reference. Lists keep their order and
/// their null slots, and may nest.
///
/// Serialized untagged: `null`, `"Author:123"`, or a JSON array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link {
    /// Known-empty reference.
    Null,
    /// Reference to one entity.
    Key(EntityKey),
    /// Ordered references for a list-valued field.
    List(Vec<Link>),
}

impl Link {
    /// Collects every entity key referenced by this link, depth first.
    pub fn entity_keys(&self) -> Vec<&EntityKey> {
        let mut out = Vec::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys<'a>(&'a self, out: &mut Vec<&'a EntityKey>) {
        match self {
            Self::Null => {}
            Self::Key(key) => out.push(key),
            Self::List(items) => {
                for item in items {
                    item.collect_keys(out);
                }
            }
        }
    }
}
