// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cross-query normalization: entities written by one operation are visible
//! to every other operation that selects them.
#![allow(clippy::unwrap_used)]

mod common;

use common::{author, q_author, q_authors, q_user, read, write};
use echo_cache_core::{DependencyIndex, EntityKey, Field, Operation, SelectionSet, Store};
use serde_json::json;

#[test]
fn second_read_hits_with_identical_data() {
    let mut store = Store::new();
    let op = q_author();
    let data = json!({"author": author("123", "Author")});
    write(&mut store, &op, &data);
    let first = read(&mut store, &op);
    let second = read(&mut store, &op);
    assert_eq!(first.data, Some(data));
    assert_eq!(first, second);
}

#[test]
fn list_write_updates_entity_seen_by_single_query() {
    let mut store = Store::new();
    let q1 = q_author();
    let q2 = q_authors();
    let mut deps = DependencyIndex::new();

    write(&mut store, &q1, &json!({"author": author("123", "Author")}));
    let r1 = read(&mut store, &q1);
    deps.replace(q1.key(), r1.touched.entities().cloned());

    let written = write(&mut store, &q2, &json!({"authors": [author("123", "Renamed")]}));
    let dependents = deps.dependents(written.touched.entities(), Some(&q2.key()));
    assert_eq!(dependents, vec![q1.key()]);

    assert_eq!(
        read(&mut store, &q1).data,
        Some(json!({"author": author("123", "Renamed")}))
    );
}

#[test]
fn unrelated_entity_has_no_dependents() {
    let mut store = Store::new();
    let q1 = q_author();
    let user = q_user();
    let mut deps = DependencyIndex::new();

    write(&mut store, &q1, &json!({"author": author("123", "Author")}));
    deps.replace(q1.key(), read(&mut store, &q1).touched.entities().cloned());

    let written = write(
        &mut store,
        &user,
        &json!({"user": {"__typename": "User", "id": "me", "name": "Me"}}),
    );
    assert_eq!(
        written.touched.entity_set().into_iter().collect::<Vec<_>>(),
        vec![EntityKey::new("User", "me")]
    );
    assert!(deps
        .dependents(written.touched.entities(), Some(&user.key()))
        .is_empty());
}

#[test]
fn field_arguments_are_separate_slots() {
    let mut store = Store::new();
    let by_id = |id: &str| {
        Operation::query(SelectionSet::new(vec![Field::object(
            "author",
            common::author_fields(),
        )
        .arg("id", json!(id))]))
    };
    write(&mut store, &by_id("1"), &json!({"author": author("1", "One")}));
    write(&mut store, &by_id("2"), &json!({"author": author("2", "Two")}));
    assert_eq!(
        read(&mut store, &by_id("1")).data,
        Some(json!({"author": author("1", "One")}))
    );
    assert!(!read(&mut store, &q_author()).is_hit());
}

#[test]
fn nested_links_are_keyed_under_their_parent() {
    let mut store = Store::new();
    let op = Operation::query(SelectionSet::new(vec![Field::object(
        "author",
        SelectionSet::new(vec![
            Field::scalar("__typename"),
            Field::scalar("id"),
            Field::object(
                "posts",
                SelectionSet::new(vec![
                    Field::scalar("__typename"),
                    Field::scalar("id"),
                    Field::scalar("title"),
                ]),
            )
            .arg("first", json!(2)),
        ]),
    )]));
    let data = json!({"author": {
        "__typename": "Author", "id": "1",
        "posts": [
            {"__typename": "Post", "id": "a", "title": "A"},
            {"__typename": "Post", "id": "b", "title": "B"}
        ]
    }});
    write(&mut store, &op, &data);
    let snapshot = store.snapshot();
    assert!(snapshot
        .links
        .keys()
        .any(|k| k.as_str() == r#"Author:1.posts({"first":2})"#));
    assert_eq!(read(&mut store, &op).data, Some(data));
}
