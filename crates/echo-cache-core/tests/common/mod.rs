// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use echo_cache_core::{
    read_operation, write_operation, Field, KeyRules, Operation, ReadOutcome, SelectionSet, Store,
    WriteMode, WriteOutcome,
};
use serde_json::{json, Value};

/// `{ __typename id name }`
pub fn author_fields() -> SelectionSet {
    SelectionSet::new(vec![
        Field::scalar("__typename"),
        Field::scalar("id"),
        Field::scalar("name"),
    ])
}

/// `{ author { __typename id name } }`
pub fn q_author() -> Operation {
    Operation::query(SelectionSet::new(vec![Field::object("author", author_fields())]))
}

/// `{ authors { __typename id name } }`
pub fn q_authors() -> Operation {
    Operation::query(SelectionSet::new(vec![Field::object("authors", author_fields())]))
}

/// `{ user { __typename id name } }`
pub fn q_user() -> Operation {
    Operation::query(SelectionSet::new(vec![Field::object("user", author_fields())]))
}

pub fn author(id: &str, name: &str) -> Value {
    json!({"__typename": "Author", "id": id, "name": name})
}

pub fn write(store: &mut Store, op: &Operation, data: &Value) -> WriteOutcome {
    write_operation(store.tracked(), &KeyRules::new(), op, data, WriteMode::Authoritative)
}

pub fn read(store: &mut Store, op: &Operation) -> ReadOutcome {
    read_operation(store.tracked(), op)
}
