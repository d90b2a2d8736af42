// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hit/miss and redelivery behavior of the exchange for plain queries.
#![allow(clippy::unwrap_used)]

use echo_cache::{CacheExchange, CacheOutcome};
use echo_cache_dry_tests::fixtures::{
    author, query_multiple, query_multiple_data, query_one, query_one_data, query_unrelated,
    query_unrelated_data, AUTHOR_ID,
};
use echo_cache_dry_tests::{init_test_tracing, RecordingSink, ScriptedTransport};
use serde_json::json;

fn scripted() -> ScriptedTransport {
    let transport = ScriptedTransport::new();
    transport.respond(&query_one(), query_one_data());
    transport.respond(&query_multiple(), query_multiple_data());
    transport.respond(&query_unrelated(), query_unrelated_data());
    transport
}

// ── 1. miss, then hit ──
#[tokio::test]
async fn writes_queries_to_the_cache() {
    init_test_tracing();
    let transport = scripted();
    let exchange = CacheExchange::builder(transport.clone(), RecordingSink::new()).build();

    let first = exchange.execute(query_one()).await;
    let second = exchange.execute(query_one()).await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(first.cache_outcome(), CacheOutcome::Miss);
    assert_eq!(second.cache_outcome(), CacheOutcome::Hit);
    assert_eq!(first.data, Some(query_one_data()));
    assert_eq!(second.data, first.data);
    assert_eq!(second.operation_key, query_one().key());

    let stats = exchange.stats();
    assert_eq!((stats.hits, stats.misses, stats.forwards), (1, 1, 1));
}

// ── 2. overlapping write redelivers the earlier query ──
#[tokio::test]
async fn updates_related_queries_when_their_data_changes() {
    init_test_tracing();
    let transport = scripted();
    let sink = RecordingSink::new();
    let exchange = CacheExchange::builder(transport.clone(), sink.clone()).build();

    exchange.execute(query_one()).await;
    assert!(sink.is_empty());

    exchange.execute(query_multiple()).await;
    assert_eq!(transport.calls(), 2);

    let redelivered = sink.redeliveries();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(redelivered[0].operation.key(), query_one().key());
    let result = redelivered[0].result.as_ref().unwrap();
    assert_eq!(result.cache_outcome(), CacheOutcome::Hit);
    assert_eq!(result.data, Some(query_one_data()));
    // The writer never redelivers itself.
    assert!(sink.for_operation(&query_multiple().key()).is_empty());
}

// ── 3. disjoint entities, no redelivery ──
#[tokio::test]
async fn does_nothing_when_no_related_queries_have_changed() {
    init_test_tracing();
    let transport = scripted();
    let sink = RecordingSink::new();
    let exchange = CacheExchange::builder(transport.clone(), sink.clone()).build();

    exchange.execute(query_one()).await;
    exchange.execute(query_unrelated()).await;

    assert_eq!(transport.calls(), 2);
    assert!(sink.is_empty());
}

// ── 4. redelivered data reflects the newer write ──
#[tokio::test]
async fn redelivery_carries_the_latest_value() {
    init_test_tracing();
    let transport = scripted();
    transport.respond(
        &query_multiple(),
        json!({"authors": [author(AUTHOR_ID, "Renamed"), author("456", "Other")]}),
    );
    let sink = RecordingSink::new();
    let exchange = CacheExchange::builder(transport, sink.clone()).build();

    exchange.execute(query_one()).await;
    exchange.execute(query_multiple()).await;

    let redelivered = sink.take();
    assert_eq!(
        redelivered[0].result.as_ref().unwrap().data,
        Some(json!({"author": author(AUTHOR_ID, "Renamed")}))
    );
    let hit = exchange.execute(query_one()).await;
    assert_eq!(hit.cache_outcome(), CacheOutcome::Hit);
    assert_eq!(hit.data, Some(json!({"author": author(AUTHOR_ID, "Renamed")})));
}

// ── 5. each dependent is redelivered once per write ──
#[tokio::test]
async fn dependents_redeliver_once_in_registration_order() {
    init_test_tracing();
    let transport = scripted();
    let sink = RecordingSink::new();
    let exchange = CacheExchange::builder(transport.clone(), sink.clone()).build();

    exchange.execute(query_multiple()).await;
    exchange.execute(query_one()).await;
    assert_eq!(sink.take().len(), 1); // query_multiple, by query_one's write

    // A third writer touching the same author redelivers both, oldest first.
    let third = author_by_id();
    transport.respond(&third, json!({"author": author(AUTHOR_ID, "Third")}));
    exchange.execute(third).await;

    let keys: Vec<_> = sink.take().iter().map(|r| r.operation.key()).collect();
    assert_eq!(keys, vec![query_multiple().key(), query_one().key()]);
}

fn author_by_id() -> echo_cache_core::Operation {
    use echo_cache_core::{Field, Operation, SelectionSet};
    use echo_cache_dry_tests::fixtures::person_fields;
    Operation::query(SelectionSet::new(vec![
        Field::object("author", person_fields()).arg("id", json!(AUTHOR_ID)),
    ]))
}

// ── 6. transport failure writes nothing ──
#[tokio::test]
async fn transport_failure_is_returned_unchanged() {
    init_test_tracing();
    let transport = ScriptedTransport::new();
    transport.fail(&query_one(), "connection refused");
    let sink = RecordingSink::new();
    let exchange = CacheExchange::builder(transport.clone(), sink.clone()).build();

    let result = exchange.execute(query_one()).await;
    assert!(result.is_error());
    assert!(result.data.is_none());
    assert_eq!(
        result.error.as_ref().unwrap().to_string(),
        "connection refused"
    );
    assert!(exchange.snapshot().is_empty());
    assert_eq!(exchange.stats().transport_failures, 1);

    // Nothing was cached, so the next execution forwards again.
    transport.respond(&query_one(), query_one_data());
    let retry = exchange.execute(query_one()).await;
    assert_eq!(retry.cache_outcome(), CacheOutcome::Miss);
    assert_eq!(transport.calls(), 2);
}
