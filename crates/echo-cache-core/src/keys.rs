// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Entity identification rules.
//!
//! A payload object is *keyable* when it carries a `__typename`, its type is
//! not registered as embedded-only, and the identification rule for that type
//! yields an id. Everything else is embedded inline under its parent.
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::ident::{EntityKey, ROOT_TYPES};

/// Field carrying the object's type name in payloads.
pub const TYPENAME_FIELD: &str = "__typename";

/// Identification rule: extracts an id from a payload object.
pub type KeyFn = Arc<dyn Fn(&Map<String, Value>) -> Option<String> + Send + Sync>;

/// Why a payload object could not be given an [`EntityKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The object has no string `__typename`.
    #[error("object has no __typename")]
    MissingTypename,
    /// The type is registered as embedded-only.
    #[error("type {0} is embedded-only")]
    Embedded(String),
    /// The identification rule yielded no id.
    #[error("no id for object of type {0}")]
    MissingId(String),
}

/// Registry of per-type identification rules.
///
/// Types without a registered rule use [`default_id`].
#[derive(Clone, Default)]
pub struct KeyRules {
    rules: HashMap<String, KeyFn>,
    embedded: BTreeSet<String>,
}

impl KeyRules {
    /// Creates a registry that uses the default rule for every type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rule` for objects of `typename`.
    pub fn with_rule<F>(mut self, typename: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Option<String> + Send + Sync + 'static,
    {
        self.rules.insert(typename.into(), Arc::new(rule));
        self
    }

    /// Marks `typename` as never normalized.
    pub fn with_embedded(mut self, typename: impl Into<String>) -> Self {
        self.embedded.insert(typename.into());
        self
    }

    /// Derives the entity key of `object`.
    ///
    /// Root type names (`Query`, `Mutation`, `Subscription`) map to their root
    /// record regardless of id.
    ///
    /// # Errors
    /// Returns a [`KeyError`] naming why the object is unkeyable.
    pub fn identify(&self, object: &Map<String, Value>) -> Result<EntityKey, KeyError> {
        let typename = object
            .get(TYPENAME_FIELD)
            .and_then(Value::as_str)
            .ok_or(KeyError::MissingTypename)?;
        if ROOT_TYPES.contains(&typename) {
            return Ok(EntityKey::root(typename));
        }
        if self.embedded.contains(typename) {
            return Err(KeyError::Embedded(typename.to_owned()));
        }
        let id = match self.rules.get(typename) {
            Some(rule) => rule(object),
            None => default_id(object),
        };
        id.map(|id| EntityKey::new(typename, &id))
            .ok_or_else(|| KeyError::MissingId(typename.to_owned()))
    }
}

impl fmt::Debug for KeyRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut typed: Vec<&String> = self.rules.keys().collect();
        typed.sort();
        f.debug_struct("KeyRules")
            .field("rules", &typed)
            .field("embedded", &self.embedded)
            .finish()
    }
}

/// Default identification rule: `id`, falling back to `_id`.
///
/// Strings are used verbatim and numbers in their JSON text form; any other
/// value (including `null`) yields no id.
pub fn default_id(object: &Map<String, Value>) -> Option<String> {
    ["id", "_id"]
        .iter()
        .find_map(|field| object.get(*field).and_then(id_text))
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
