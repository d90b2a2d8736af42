// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation and payload fixtures.
//!
//! ```text
//! query_one        { author  { __typename id name } }
//! query_multiple   { authors { __typename id name } }
//! query_unrelated  { user    { __typename id name } }
//! conceal_author   mutation { concealAuthor { __typename id name } }
//! ```

use echo_cache_core::{Field, Operation, SelectionSet, Variables};
use serde_json::{json, Value};

/// Id of the author every fixture shares.
pub const AUTHOR_ID: &str = "123";

/// `{ __typename id name }`
pub fn person_fields() -> SelectionSet {
    SelectionSet::new(vec![
        Field::scalar("__typename"),
        Field::scalar("id"),
        Field::scalar("name"),
    ])
}

/// `{ author { __typename id name } }`
pub fn query_one() -> Operation {
    Operation::query(SelectionSet::new(vec![Field::object("author", person_fields())]))
}

/// `{ authors { __typename id name } }`
pub fn query_multiple() -> Operation {
    Operation::query(SelectionSet::new(vec![Field::object("authors", person_fields())]))
}

/// `{ user { __typename id name } }`
pub fn query_unrelated() -> Operation {
    Operation::query(SelectionSet::new(vec![Field::object("user", person_fields())]))
}

/// `mutation { concealAuthor { __typename id name } }`
pub fn conceal_author() -> Operation {
    Operation::mutation(
        SelectionSet::new(vec![Field::object("concealAuthor", person_fields())]),
        Variables::new(),
    )
}

/// An `Author` payload object.
pub fn author(id: &str, name: &str) -> Value {
    json!({"__typename": "Author", "id": id, "name": name})
}

/// Response for [`query_one`].
pub fn query_one_data() -> Value {
    json!({"author": author(AUTHOR_ID, "Author")})
}

/// Response for [`query_multiple`].
pub fn query_multiple_data() -> Value {
    json!({"authors": [author(AUTHOR_ID, "Author")]})
}

/// Response for [`query_unrelated`].
pub fn query_unrelated_data() -> Value {
    json!({"user": {"__typename": "User", "id": "me", "name": "Me"}})
}

/// Response for [`conceal_author`] carrying `name`.
pub fn conceal_author_data(name: &str) -> Value {
    json!({"concealAuthor": author(AUTHOR_ID, name)})
}
