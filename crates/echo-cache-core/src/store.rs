// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Normalized entity/link store.
//!
//! [`Store`] owns two flat tables plus a stack of optimistic layers. It has no
//! public accessors for table contents: every read and write goes through a
//! [`TrackedStore`] handle, which records the keys it touches so the caller
//! can compute dependencies for exactly that traversal.
use std::collections::BTreeMap;

use serde_json::Value;

use crate::ident::{EntityKey, LayerId, LinkKey};
use crate::overlay::OverlayLayer;
use crate::record::{Entity, Link};
use crate::snapshot::Snapshot;
use crate::touch::{StoreKey, TouchLog, Touched};

/// Where a tracked handle sends its writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteTarget {
    Base,
    Layer(LayerId),
}

/// Base tables plus the optimistic layer stack.
#[derive(Debug, Clone, Default)]
pub struct Store {
    records: BTreeMap<EntityKey, Entity>,
    links: BTreeMap<LinkKey, Link>,
    layers: Vec<OverlayLayer>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `snapshot`'s tables.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            records: snapshot.records,
            links: snapshot.links,
            layers: Vec::new(),
        }
    }

    /// Owned copy of the base tables; optimistic layers are not included.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.records.clone(),
            links: self.links.clone(),
            ..Snapshot::default()
        }
    }

    /// Handle whose writes land in the base tables.
    pub fn tracked(&mut self) -> TrackedStore<'_> {
        TrackedStore::new(self, WriteTarget::Base)
    }

    /// Handle whose writes land in layer `id`, creating the layer on top of
    /// the stack if it does not exist yet.
    pub fn tracked_layer(&mut self, id: LayerId) -> TrackedStore<'_> {
        self.layer_mut(id);
        TrackedStore::new(self, WriteTarget::Layer(id))
    }

    /// Drops layer `id` and returns the keys it covered.
    ///
    /// Unknown ids yield an empty list.
    pub fn discard_layer(&mut self, id: LayerId) -> Vec<StoreKey> {
        match self.layers.iter().position(|layer| layer.id() == id) {
            Some(pos) => self.layers.remove(pos).covered_keys(),
            None => Vec::new(),
        }
    }

    /// Returns `true` if layer `id` is applied.
    pub fn has_layer(&self, id: LayerId) -> bool {
        self.layers.iter().any(|layer| layer.id() == id)
    }

    /// Number of applied layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Number of base entity records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of base link slots.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    fn layer_mut(&mut self, id: LayerId) -> &mut OverlayLayer {
        let pos = match self.layers.iter().position(|layer| layer.id() == id) {
            Some(pos) => pos,
            None => {
                self.layers.push(OverlayLayer::new(id));
                self.layers.len() - 1
            }
        };
        &mut self.layers[pos]
    }

    fn merged_entity(&self, key: &EntityKey) -> Option<Entity> {
        let base = self.records.get(key);
        if base.is_none() && !self.layers.iter().any(|l| l.has_entity(key)) {
            return None;
        }
        let mut entity = base.cloned().unwrap_or_default();
        for layer in &self.layers {
            layer.apply_entity(key, &mut entity);
        }
        Some(entity)
    }

    fn merged_link(&self, key: &LinkKey) -> Option<Link> {
        for layer in self.layers.iter().rev() {
            if let Some(shadowed) = layer.link(key) {
                return shadowed.cloned();
            }
        }
        self.links.get(key).cloned()
    }
}

/// Access handle that records every key it touches.
///
/// Reads see the base tables with every applied layer on top. Writes go to
/// the base or to one layer, fixed when the handle is created. Root records
/// are never recorded as touched; link slots always are.
#[derive(Debug)]
pub struct TrackedStore<'s> {
    store: &'s mut Store,
    target: WriteTarget,
    log: TouchLog,
}

impl<'s> TrackedStore<'s> {
    fn new(store: &'s mut Store, target: WriteTarget) -> Self {
        Self {
            store,
            target,
            log: TouchLog::new(),
        }
    }

    /// Layer receiving this handle's writes, if any.
    pub fn layer(&self) -> Option<LayerId> {
        match self.target {
            WriteTarget::Base => None,
            WriteTarget::Layer(id) => Some(id),
        }
    }

    /// Copy of entity `key`, if present.
    pub fn get(&mut self, key: &EntityKey) -> Option<Entity> {
        self.touch_entity(key);
        self.store.merged_entity(key)
    }

    /// Copy of entity `key`, creating an empty record if absent.
    pub fn get_or_create(&mut self, key: &EntityKey) -> Entity {
        self.touch_entity(key);
        if let Some(entity) = self.store.merged_entity(key) {
            return entity;
        }
        match self.target {
            WriteTarget::Base => {
                self.store.records.insert(key.clone(), Entity::new());
            }
            WriteTarget::Layer(id) => self.store.layer_mut(id).create_entity(key),
        }
        Entity::new()
    }

    /// Replaces `field` of entity `key`.
    ///
    /// `None` and `Some(Value::Null)` both delete the field.
    pub fn write_field(&mut self, key: &EntityKey, field: &str, value: Option<Value>) {
        self.touch_entity(key);
        let value = value.filter(|value| !value.is_null());
        match self.target {
            WriteTarget::Base => match value {
                Some(value) => self
                    .store
                    .records
                    .entry(key.clone())
                    .or_default()
                    .set(field, value),
                None => {
                    if let Some(entity) = self.store.records.get_mut(key) {
                        entity.remove(field);
                    }
                }
            },
            WriteTarget::Layer(id) => self.store.layer_mut(id).write_field(key, field, value),
        }
    }

    /// Copy of link slot `key`, if present.
    pub fn link(&mut self, key: &LinkKey) -> Option<Link> {
        self.log.record(StoreKey::Link(key.clone()));
        self.store.merged_link(key)
    }

    /// Replaces link slot `key`; `None` deletes it.
    pub fn write_link(&mut self, key: &LinkKey, link: Option<Link>) {
        self.log.record(StoreKey::Link(key.clone()));
        match self.target {
            WriteTarget::Base => match link {
                Some(link) => {
                    self.store.links.insert(key.clone(), link);
                }
                None => {
                    self.store.links.remove(key);
                }
            },
            WriteTarget::Layer(id) => self.store.layer_mut(id).write_link(key, link),
        }
    }

    /// Takes the keys touched since the last drain.
    pub fn drain_touched(&mut self) -> Touched {
        self.log.drain()
    }

    /// Consumes the handle and returns the keys it touched.
    pub fn into_touched(mut self) -> Touched {
        self.log.drain()
    }

    fn touch_entity(&mut self, key: &EntityKey) {
        if !key.is_root() {
            self.log.record(StoreKey::Entity(key.clone()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn author() -> EntityKey {
        EntityKey::new("Author", "123")
    }

    // ── 1. field writes: absent and null both delete ──
    #[test]
    fn absent_and_null_delete_the_field() {
        let mut store = Store::new();
        let mut tracked = store.tracked();
        tracked.write_field(&author(), "name", Some(json!("Author")));
        tracked.write_field(&author(), "bio", Some(json!("Writes things")));
        tracked.write_field(&author(), "name", None);
        tracked.write_field(&author(), "bio", Some(Value::Null));
        let entity = tracked.get(&author()).unwrap();
        assert_eq!(entity.field("name"), None);
        assert_eq!(entity.field("bio"), None);
        assert!(entity.is_empty());
    }

    #[test]
    fn null_in_a_layer_shadows_the_base_field() {
        let mut store = Store::new();
        store.tracked().write_field(&author(), "name", Some(json!("Author")));
        store
            .tracked_layer(LayerId::from_raw(1))
            .write_field(&author(), "name", Some(Value::Null));
        assert_eq!(store.tracked().get(&author()).unwrap().field("name"), None);
        store.discard_layer(LayerId::from_raw(1));
        assert_eq!(
            store.tracked().get(&author()).unwrap().field("name"),
            Some(&json!("Author"))
        );
    }

    // ── 2. touch log: dedup, first-touch order, roots excluded ──
    #[test]
    fn touches_are_deduplicated_and_skip_roots() {
        let mut store = Store::new();
        let mut tracked = store.tracked();
        let root = EntityKey::root("Query");
        tracked.write_field(&root, "version", Some(json!(1)));
        tracked.write_link(&LinkKey::from_raw("author"), Some(Link::Key(author())));
        tracked.write_field(&author(), "name", Some(json!("A")));
        let _ = tracked.get(&author());
        let touched = tracked.drain_touched();
        assert_eq!(
            touched.keys(),
            &[
                StoreKey::Link(LinkKey::from_raw("author")),
                StoreKey::Entity(author()),
            ]
        );
        assert!(tracked.drain_touched().is_empty());
    }

    // ── 3. get_or_create materializes empty records ──
    #[test]
    fn get_or_create_creates_empty_record() {
        let mut store = Store::new();
        let mut tracked = store.tracked();
        assert!(tracked.get(&author()).is_none());
        assert!(tracked.get_or_create(&author()).is_empty());
        assert!(tracked.get(&author()).is_some());
        drop(tracked);
        assert_eq!(store.record_count(), 1);
    }

    // ── 4. link slots: absent vs null ──
    #[test]
    fn link_absent_is_distinct_from_null() {
        let mut store = Store::new();
        let mut tracked = store.tracked();
        let slot = LinkKey::from_raw("author");
        assert_eq!(tracked.link(&slot), None);
        tracked.write_link(&slot, Some(Link::Null));
        assert_eq!(tracked.link(&slot), Some(Link::Null));
        tracked.write_link(&slot, None);
        assert_eq!(tracked.link(&slot), None);
    }

    // ── 5. layers shadow the base until discarded ──
    #[test]
    fn layers_shadow_base_and_discard_restores_it() {
        let mut store = Store::new();
        store
            .tracked()
            .write_field(&author(), "name", Some(json!("Base")));

        let id = LayerId::from_raw(1);
        let mut layered = store.tracked_layer(id);
        layered.write_field(&author(), "name", Some(json!("Speculative")));
        assert_eq!(layered.layer(), Some(id));
        drop(layered);

        let mut reader = store.tracked();
        assert_eq!(
            reader.get(&author()).unwrap().field("name"),
            Some(&json!("Speculative"))
        );
        // Base writes stay hidden under the layer.
        reader.write_field(&author(), "name", Some(json!("Authoritative")));
        assert_eq!(
            reader.get(&author()).unwrap().field("name"),
            Some(&json!("Speculative"))
        );
        drop(reader);

        let covered = store.discard_layer(id);
        assert_eq!(covered, vec![StoreKey::Entity(author())]);
        assert!(!store.has_layer(id));
        assert_eq!(
            store.tracked().get(&author()).unwrap().field("name"),
            Some(&json!("Authoritative"))
        );
        assert!(store.discard_layer(id).is_empty());
    }

    // ── 6. newest layer wins ──
    #[test]
    fn newest_layer_wins_for_links() {
        let mut store = Store::new();
        let slot = LinkKey::from_raw("author");
        store
            .tracked_layer(LayerId::from_raw(1))
            .write_link(&slot, Some(Link::Null));
        store
            .tracked_layer(LayerId::from_raw(2))
            .write_link(&slot, Some(Link::Key(author())));
        assert_eq!(store.layer_count(), 2);
        assert_eq!(store.tracked().link(&slot), Some(Link::Key(author())));
        store.discard_layer(LayerId::from_raw(2));
        assert_eq!(store.tracked().link(&slot), Some(Link::Null));
    }

    // ── 7. snapshots never alias live state ──
    #[test]
    fn snapshot_is_an_owned_copy_without_layers() {
        let mut store = Store::new();
        store.tracked().write_field(&author(), "name", Some(json!("A")));
        store
            .tracked_layer(LayerId::from_raw(1))
            .write_field(&author(), "name", Some(json!("S")));
        let snapshot = store.snapshot();
        store.tracked().write_field(&author(), "name", Some(json!("B")));
        assert_eq!(
            snapshot.records[&author()].field("name"),
            Some(&json!("A"))
        );
        let restored = Store::from_snapshot(snapshot);
        assert_eq!(restored.layer_count(), 0);
        assert_eq!(restored.record_count(), 1);
    }
}
