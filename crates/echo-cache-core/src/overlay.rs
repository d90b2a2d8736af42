// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Copy-on-write optimistic layers.
//!
//! A layer stores only what one speculative write changed: per entity a field
//! diff (`Some` = set, `None` = deleted) and per link slot the replacement
//! (`Some` = link, `None` = deleted). Layers stack in creation order over the
//! base tables and the newest layer wins on read. Nothing in a layer is ever
//! copied into the base; discarding a layer simply drops it.
use std::collections::BTreeMap;

use serde_json::Value;

use crate::ident::{EntityKey, LayerId, LinkKey};
use crate::record::{Entity, Link};
use crate::touch::StoreKey;

/// Field-level diff of one entity inside a layer.
///
/// Presence of a diff (even an empty one) means the entity exists while the
/// layer is applied.
pub type EntityDiff = BTreeMap<String, Option<Value>>;

/// One speculative write's diff over the tables below it.
#[derive(Clone, Debug)]
pub struct OverlayLayer {
    id: LayerId,
    entities: BTreeMap<EntityKey, EntityDiff>,
    links: BTreeMap<LinkKey, Option<Link>>,
}

impl OverlayLayer {
    /// Creates an empty layer.
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            entities: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    /// Layer identity.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Marks `key` as existing in this layer.
    pub fn create_entity(&mut self, key: &EntityKey) {
        self.entities.entry(key.clone()).or_default();
    }

    /// Records a field replacement (`None` deletes).
    pub fn write_field(&mut self, key: &EntityKey, field: &str, value: Option<Value>) {
        self.entities
            .entry(key.clone())
            .or_default()
            .insert(field.to_owned(), value);
    }

    /// Records a link replacement (`None` deletes).
    pub fn write_link(&mut self, key: &LinkKey, link: Option<Link>) {
        self.links.insert(key.clone(), link);
    }

    /// Returns `true` if the layer carries a diff for `key`.
    pub fn has_entity(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Applies this layer's diff for `key` onto `entity`.
    pub fn apply_entity(&self, key: &EntityKey, entity: &mut Entity) {
        if let Some(diff) = self.entities.get(key) {
            for (field, value) in diff {
                match value {
                    Some(v) => entity.set(field.clone(), v.clone()),
                    None => {
                        entity.remove(field);
                    }
                }
            }
        }
    }

    /// Shadowed link slot: `None` if the layer does not cover `key`,
    /// `Some(None)` if the layer deleted it.
    pub fn link(&self, key: &LinkKey) -> Option<Option<&Link>> {
        self.links.get(key).map(Option::as_ref)
    }

    /// Every key this layer covers: entities first, then links.
    pub fn covered_keys(&self) -> Vec<StoreKey> {
        self.entities
            .keys()
            .cloned()
            .map(StoreKey::Entity)
            .chain(self.links.keys().cloned().map(StoreKey::Link))
            .collect()
    }

    /// Returns `true` if nothing was written into the layer.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.links.is_empty()
    }
}
