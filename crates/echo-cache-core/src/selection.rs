// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pre-built selection trees and operations.
//!
//! The cache never parses a query language; hosts hand it a [`SelectionSet`]
//! built with the [`Field`] builders below.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ident::{field_key, write_canonical, EntityKey, OperationKey};

/// Operation variables, by name.
pub type Variables = Map<String, Value>;

/// Argument value: a literal or a reference to an operation variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    /// Inline literal.
    Literal(Value),
    /// `$name`, resolved against the operation's variables.
    Variable(String),
}

/// One selected field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Schema field name; part of the store key.
    pub name: String,
    /// Response key override; payloads and results use it instead of `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Arguments, sorted by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, ArgValue>,
    /// Sub-selection for object and list-of-object fields; `None` for scalars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionSet>,
}

impl Field {
    /// A scalar (leaf) field.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: BTreeMap::new(),
            selection: None,
        }
    }

    /// An object or list-of-object field with a sub-selection.
    pub fn object(name: impl Into<String>, selection: SelectionSet) -> Self {
        Self {
            selection: Some(selection),
            ..Self::scalar(name)
        }
    }

    /// Sets the response alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds a literal argument.
    pub fn arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), ArgValue::Literal(value));
        self
    }

    /// Adds an argument bound to the operation variable `variable`.
    pub fn var(mut self, name: impl Into<String>, variable: impl Into<String>) -> Self {
        self.arguments
            .insert(name.into(), ArgValue::Variable(variable.into()));
        self
    }

    /// Key under which this field appears in payloads and results.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Resolves arguments against `variables`.
    ///
    /// Arguments bound to an undefined variable are omitted.
    pub fn resolve_arguments(&self, variables: &Variables) -> Map<String, Value> {
        self.arguments
            .iter()
            .filter_map(|(name, arg)| {
                let value = match arg {
                    ArgValue::Literal(v) => v.clone(),
                    ArgValue::Variable(var) => variables.get(var)?.clone(),
                };
                Some((name.clone(), value))
            })
            .collect()
    }

    /// Store field key (`name` or `name(<canonical args>)`).
    pub fn store_key(&self, variables: &Variables) -> String {
        field_key(&self.name, &self.resolve_arguments(variables))
    }

    /// Returns `true` for leaf fields.
    pub fn is_scalar(&self) -> bool {
        self.selection.is_none()
    }
}

/// Ordered list of selected fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet(Vec<Field>);

impl SelectionSet {
    /// Wraps `fields` in selection order.
    pub fn new(fields: Vec<Field>) -> Self {
        Self(fields)
    }

    /// Fields in selection order.
    pub fn fields(&self) -> &[Field] {
        &self.0
    }

    /// Finds the field answering to `response_key`.
    pub fn get(&self, response_key: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.response_key() == response_key)
    }

    /// Returns `true` if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Field> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Read: served from cache when possible.
    Query,
    /// Write: always forwarded.
    Mutation,
}

impl OperationKind {
    /// Type name of the operation's root record.
    pub const fn root_type(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Query => 1,
            Self::Mutation => 2,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Mutation => f.write_str("mutation"),
        }
    }
}

/// A typed operation: kind, selection tree and variables, plus the derived key.
///
/// The selection is shared (`Arc`) so clones stay cheap when the engine keeps
/// an operation registered for redelivery.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    kind: OperationKind,
    selection: Arc<SelectionSet>,
    variables: Variables,
    key: OperationKey,
}

impl Operation {
    /// Builds an operation and derives its key.
    pub fn new(kind: OperationKind, selection: SelectionSet, variables: Variables) -> Self {
        let key = make_operation_key(kind, &selection, &variables);
        Self {
            kind,
            selection: Arc::new(selection),
            variables,
            key,
        }
    }

    /// Shorthand for a query without variables.
    pub fn query(selection: SelectionSet) -> Self {
        Self::new(OperationKind::Query, selection, Variables::new())
    }

    /// Shorthand for a mutation with `variables`.
    pub fn mutation(selection: SelectionSet, variables: Variables) -> Self {
        Self::new(OperationKind::Mutation, selection, variables)
    }

    /// Operation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Root selection.
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Variables.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Stable identity.
    pub fn key(&self) -> OperationKey {
        self.key
    }

    /// Key of the root record this operation reads from and writes to.
    pub fn root_key(&self) -> EntityKey {
        EntityKey::root(self.kind.root_type())
    }
}

/// Produces a stable, domain-separated operation identity (prefix `b"operation:"`).
///
/// Hashes the kind tag, the selection tree (length-prefixed names, aliases and
/// canonical arguments) and the canonical JSON of the variables.
pub fn make_operation_key(
    kind: OperationKind,
    selection: &SelectionSet,
    variables: &Variables,
) -> OperationKey {
    let mut hasher = Hasher::new();
    hasher.update(b"operation:");
    hasher.update(&[kind.tag()]);
    hash_selection(&mut hasher, selection);
    let mut vars = String::new();
    write_canonical(&Value::Object(variables.clone()), &mut vars);
    hash_str(&mut hasher, &vars);
    OperationKey(hasher.finalize().into())
}

fn hash_selection(hasher: &mut Hasher, selection: &SelectionSet) {
    hasher.update(&(selection.0.len() as u64).to_le_bytes());
    for field in &selection.0 {
        hash_str(hasher, &field.name);
        hash_str(hasher, field.alias.as_deref().unwrap_or(""));
        hasher.update(&(field.arguments.len() as u64).to_le_bytes());
        for (name, arg) in &field.arguments {
            hash_str(hasher, name);
            let mut text = String::new();
            match arg {
                ArgValue::Literal(v) => {
                    text.push('=');
                    write_canonical(v, &mut text);
                }
                ArgValue::Variable(var) => {
                    text.push('$');
                    text.push_str(var);
                }
            }
            hash_str(hasher, &text);
        }
        match &field.selection {
            Some(sub) => {
                hasher.update(&[1]);
                hash_selection(hasher, sub);
            }
            None => {
                hasher.update(&[0]);
            }
        }
    }
}

fn hash_str(hasher: &mut Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}
