// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Speculative mutation resolvers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use echo_cache_core::Operation;
use serde_json::{Map, Value};

/// Speculative resolver: resolved field arguments to a provisional result.
pub type OptimisticFn = Arc<dyn Fn(&Map<String, Value>) -> Option<Value> + Send + Sync>;

/// Registry of speculative resolvers, by root mutation field name.
#[derive(Clone, Default)]
pub struct OptimisticResolvers {
    resolvers: HashMap<String, OptimisticFn>,
}

impl OptimisticResolvers {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver` for the root mutation field `field`.
    pub fn with_resolver<F>(mut self, field: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.resolvers.insert(field.into(), Arc::new(resolver));
        self
    }

    /// Returns `true` if no resolver is registered.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Runs the resolver of every root field of `op` that has one.
    ///
    /// Returns a partial payload keyed by response key, or `None` when no
    /// resolver produced a value.
    pub fn resolve(&self, op: &Operation) -> Option<Value> {
        let mut payload = Map::new();
        for field in op.selection().fields() {
            let Some(resolver) = self.resolvers.get(&field.name) else {
                continue;
            };
            if let Some(value) = resolver(&field.resolve_arguments(op.variables())) {
                payload.insert(field.response_key().to_owned(), value);
            }
        }
        if payload.is_empty() {
            None
        } else {
            Some(Value::Object(payload))
        }
    }
}

impl fmt::Debug for OptimisticResolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.resolvers.keys().collect();
        fields.sort();
        f.debug_struct("OptimisticResolvers")
            .field("fields", &fields)
            .finish()
    }
}
