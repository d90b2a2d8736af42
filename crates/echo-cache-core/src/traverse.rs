// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read and write traversals over a selection tree.
//!
//! Writes normalize a payload into the store: keyable objects become entity
//! records referenced from link slots, everything else is stored on the
//! parent record. Embedded values are stored under *store* field keys (name
//! plus arguments) so that aliased selections read them back correctly.
//!
//! Reads reassemble a payload from the store and report a miss as soon as
//! any selected scalar, link slot or referenced entity is absent.
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::ident::{EntityKey, LinkKey};
use crate::keys::{KeyError, KeyRules, TYPENAME_FIELD};
use crate::record::{Entity, Link};
use crate::selection::{Field, Operation, SelectionSet, Variables};
use crate::store::TrackedStore;
use crate::touch::Touched;

/// Result of a read traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    /// Reassembled payload; `None` on a miss.
    pub data: Option<Value>,
    /// Keys the read touched, including those visited before a miss.
    pub touched: Touched,
}

impl ReadOutcome {
    /// Returns `true` if every selected field resolved.
    pub fn is_hit(&self) -> bool {
        self.data.is_some()
    }
}

/// Result of a write traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Keys the write touched.
    pub touched: Touched,
}

/// How a write treats selected fields the payload does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Missing fields are written as absent (deleted) and logged.
    Authoritative,
    /// Missing fields are left untouched; speculative results are partial.
    Speculative,
}

/// Reads `op` from `store`.
pub fn read_operation(store: TrackedStore<'_>, op: &Operation) -> ReadOutcome {
    let mut reader = Reader {
        store,
        variables: op.variables(),
    };
    let root = op.root_key();
    let data = reader.read_entity(&root, op.selection()).map(Value::Object);
    let touched = reader.store.into_touched();
    trace!(op = %op.key().short(), hit = data.is_some(), touched = touched.len(), "read traversal");
    ReadOutcome { data, touched }
}

/// Writes `data` for `op` through `store`.
///
/// A non-object payload writes nothing.
pub fn write_operation(
    store: TrackedStore<'_>,
    rules: &KeyRules,
    op: &Operation,
    data: &Value,
    mode: WriteMode,
) -> WriteOutcome {
    let mut writer = Writer {
        store,
        rules,
        variables: op.variables(),
        mode,
    };
    match data {
        Value::Object(payload) => {
            let root = op.root_key();
            writer.write_fields(&root, op.selection(), payload);
        }
        other => warn!(op = %op.key().short(), kind = json_kind(other), "payload root is not an object; nothing written"),
    }
    let touched = writer.store.into_touched();
    trace!(op = %op.key().short(), ?mode, touched = touched.len(), "write traversal");
    WriteOutcome { touched }
}

struct Reader<'a, 's> {
    store: TrackedStore<'s>,
    variables: &'a Variables,
}

impl Reader<'_, '_> {
    fn read_entity(&mut self, key: &EntityKey, selection: &SelectionSet) -> Option<Map<String, Value>> {
        let entity = match self.store.get(key) {
            Some(entity) => entity,
            None if key.is_root() => Entity::new(),
            None => return None,
        };
        let mut out = Map::new();
        for field in selection.fields() {
            let value = self.read_field(key, &entity, field)?;
            out.insert(field.response_key().to_owned(), value);
        }
        Some(out)
    }

    fn read_field(&mut self, key: &EntityKey, entity: &Entity, field: &Field) -> Option<Value> {
        if field.name == TYPENAME_FIELD {
            return entity
                .field(TYPENAME_FIELD)
                .cloned()
                .or_else(|| key.is_root().then(|| Value::from(key.as_str())));
        }
        let store_key = field.store_key(self.variables);
        let Some(sub) = &field.selection else {
            return entity.field(&store_key).cloned();
        };
        let link_key = LinkKey::new(key, &store_key);
        if let Some(link) = self.store.link(&link_key) {
            return self.read_link(&link, sub);
        }
        entity
            .field(&store_key)
            .and_then(|embedded| project(embedded, sub, self.variables))
    }

    fn read_link(&mut self, link: &Link, selection: &SelectionSet) -> Option<Value> {
        match link {
            Link::Null => Some(Value::Null),
            Link::Key(key) => self.read_entity(key, selection).map(Value::Object),
            Link::List(items) => items
                .iter()
                .map(|item| self.read_link(item, selection))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

/// Rebuilds a response-keyed value from an embedded (store-keyed) value.
fn project(value: &Value, selection: &SelectionSet, variables: &Variables) -> Option<Value> {
    match value {
        Value::Null => Some(Value::Null),
        Value::Array(items) => items
            .iter()
            .map(|item| project(item, selection, variables))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        Value::Object(stored) => {
            let mut out = Map::new();
            for field in selection.fields() {
                let value = if field.name == TYPENAME_FIELD {
                    stored.get(TYPENAME_FIELD)?.clone()
                } else {
                    let inner = stored.get(&field.store_key(variables))?;
                    match &field.selection {
                        None => inner.clone(),
                        Some(sub) => project(inner, sub, variables)?,
                    }
                };
                out.insert(field.response_key().to_owned(), value);
            }
            Some(Value::Object(out))
        }
        _ => None,
    }
}

/// Why a nested payload value could not become a link.
enum Unlinkable {
    /// Contains an object without an entity key; store it inline.
    Embed,
    /// Not an object, list or null.
    Mismatch,
}

struct Writer<'a, 's> {
    store: TrackedStore<'s>,
    rules: &'a KeyRules,
    variables: &'a Variables,
    mode: WriteMode,
}

impl Writer<'_, '_> {
    fn write_fields(&mut self, key: &EntityKey, selection: &SelectionSet, payload: &Map<String, Value>) {
        for field in selection.fields() {
            let response_key = field.response_key();
            if field.name == TYPENAME_FIELD {
                if let Some(typename) = payload.get(response_key) {
                    self.store.write_field(key, TYPENAME_FIELD, Some(typename.clone()));
                }
                continue;
            }
            let store_key = field.store_key(self.variables);
            match (payload.get(response_key), &field.selection) {
                (None, _) => {
                    if self.mode == WriteMode::Authoritative {
                        warn!(entity = %key, field = response_key, "payload is missing a selected field; writing it as absent");
                        self.clear(key, &store_key, field.is_scalar());
                    }
                }
                (Some(value), None) => self.store.write_field(key, &store_key, Some(value.clone())),
                (Some(value), Some(sub)) => self.write_nested(key, &store_key, value, sub),
            }
        }
    }

    fn write_nested(&mut self, parent: &EntityKey, store_key: &str, value: &Value, selection: &SelectionSet) {
        let link_key = LinkKey::new(parent, store_key);
        match self.link_for(value, selection) {
            Ok(link) => {
                self.store.write_link(&link_key, Some(link));
                let stale = self
                    .store
                    .get(parent)
                    .is_some_and(|entity| entity.field(store_key).is_some());
                if stale {
                    self.store.write_field(parent, store_key, None);
                }
            }
            Err(Unlinkable::Embed) => {
                let embedded = embed(value, selection, self.variables);
                self.store.write_field(parent, store_key, Some(embedded));
                self.store.write_link(&link_key, None);
            }
            Err(Unlinkable::Mismatch) => {
                warn!(entity = %parent, field = store_key, kind = json_kind(value), "payload shape does not match selection; writing it as absent");
                self.clear(parent, store_key, false);
            }
        }
    }

    fn link_for(&mut self, value: &Value, selection: &SelectionSet) -> Result<Link, Unlinkable> {
        match value {
            Value::Null => Ok(Link::Null),
            Value::Object(object) => {
                let key = self.identify(object).ok_or(Unlinkable::Embed)?;
                self.write_entity(&key, selection, object);
                Ok(Link::Key(key))
            }
            Value::Array(items) => {
                if !self.linkable(value)? {
                    return Err(Unlinkable::Embed);
                }
                items
                    .iter()
                    .map(|item| self.link_for(item, selection))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Link::List)
            }
            _ => Err(Unlinkable::Mismatch),
        }
    }

    /// Checks a list up front so a partially keyable list is embedded whole
    /// instead of half-normalized.
    fn linkable(&self, value: &Value) -> Result<bool, Unlinkable> {
        match value {
            Value::Null => Ok(true),
            Value::Object(object) => Ok(self.identify(object).is_some()),
            Value::Array(items) => {
                for item in items {
                    if !self.linkable(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Err(Unlinkable::Mismatch),
        }
    }

    fn identify(&self, object: &Map<String, Value>) -> Option<EntityKey> {
        match self.rules.identify(object) {
            Ok(key) => Some(key),
            Err(err @ KeyError::Embedded(_)) => {
                debug!(%err, "embedding object inline");
                None
            }
            Err(err) => {
                warn!(%err, "object is unkeyable; embedding it inline");
                None
            }
        }
    }

    fn write_entity(&mut self, key: &EntityKey, selection: &SelectionSet, object: &Map<String, Value>) {
        self.store.get_or_create(key);
        if let Some(typename) = object.get(TYPENAME_FIELD) {
            self.store.write_field(key, TYPENAME_FIELD, Some(typename.clone()));
        }
        self.write_fields(key, selection, object);
    }

    fn clear(&mut self, key: &EntityKey, store_key: &str, scalar: bool) {
        self.store.write_field(key, store_key, None);
        if !scalar {
            self.store.write_link(&LinkKey::new(key, store_key), None);
        }
    }
}

/// Converts a response-keyed payload value into its store-keyed inline form.
fn embed(value: &Value, selection: &SelectionSet, variables: &Variables) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| embed(item, selection, variables))
                .collect(),
        ),
        Value::Object(payload) => {
            let mut stored = Map::new();
            if let Some(typename) = payload.get(TYPENAME_FIELD) {
                stored.insert(TYPENAME_FIELD.to_owned(), typename.clone());
            }
            for field in selection.fields() {
                if field.name == TYPENAME_FIELD {
                    continue;
                }
                let Some(inner) = payload.get(field.response_key()) else {
                    continue;
                };
                let inner = match &field.selection {
                    None => inner.clone(),
                    Some(sub) => embed(inner, sub, variables),
                };
                stored.insert(field.store_key(variables), inner);
            }
            Value::Object(stored)
        }
        other => other.clone(),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
