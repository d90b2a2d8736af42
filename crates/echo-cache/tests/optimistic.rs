// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Speculative mutation results: applied before the response, replaced by
//! the authoritative result, rolled back on failure.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use echo_cache::{CacheConfig, CacheExchange, ChannelSink, OptimisticResolvers};
use echo_cache_dry_tests::fixtures::{
    author, conceal_author, conceal_author_data, query_one, query_one_data, AUTHOR_ID,
};
use echo_cache_dry_tests::{init_test_tracing, RecordingSink, ScriptedTransport};
use serde_json::json;

const OFFLINE: &str = "[REDACTED OFFLINE]";
const ONLINE: &str = "[REDACTED ONLINE]";

fn conceal_resolvers() -> OptimisticResolvers {
    OptimisticResolvers::new()
        .with_resolver("concealAuthor", |_| Some(author(AUTHOR_ID, OFFLINE)))
}

fn author_named(name: &str) -> Option<serde_json::Value> {
    Some(json!({"author": author(AUTHOR_ID, name)}))
}

#[tokio::test]
async fn writes_optimistic_mutations_to_the_cache() {
    init_test_tracing();
    let transport = ScriptedTransport::new();
    transport.respond(&query_one(), query_one_data());
    transport.respond(&conceal_author(), conceal_author_data(ONLINE));
    transport.hold(&conceal_author());

    let (sink, mut rx) = ChannelSink::new();
    let exchange = Arc::new(
        CacheExchange::builder(transport.clone(), sink)
            .optimistic(conceal_resolvers())
            .build(),
    );

    exchange.execute(query_one()).await;
    assert_eq!(transport.calls(), 1);

    let pending = {
        let exchange = Arc::clone(&exchange);
        tokio::spawn(async move { exchange.execute(conceal_author()).await })
    };

    // Speculative redelivery arrives while the response is still held.
    let speculative = rx.recv().await.unwrap();
    assert_eq!(speculative.operation.key(), query_one().key());
    assert_eq!(speculative.result.unwrap().data, author_named(OFFLINE));
    assert!(!pending.is_finished());

    transport.release(&conceal_author());
    let result = pending.await.unwrap();
    assert_eq!(result.data, Some(conceal_author_data(ONLINE)));
    assert_eq!(transport.calls(), 2);

    let authoritative = rx.recv().await.unwrap();
    assert_eq!(authoritative.operation.key(), query_one().key());
    assert_eq!(authoritative.result.unwrap().data, author_named(ONLINE));
    assert!(rx.try_recv().is_err());

    let stats = exchange.stats();
    assert_eq!(stats.optimistic_writes, 1);
    assert_eq!(stats.redeliveries, 2);

    let hit = exchange.execute(query_one()).await;
    assert_eq!(hit.data, author_named(ONLINE));
}

#[tokio::test]
async fn failed_mutation_rolls_back_the_speculative_value() {
    init_test_tracing();
    let transport = ScriptedTransport::new();
    transport.respond(&query_one(), query_one_data());
    transport.fail(&conceal_author(), "offline");

    let sink = RecordingSink::new();
    let exchange = CacheExchange::builder(transport, sink.clone())
        .optimistic(conceal_resolvers())
        .build();

    exchange.execute(query_one()).await;
    let result = exchange.execute(conceal_author()).await;
    assert!(result.is_error());

    let names: Vec<_> = sink
        .take()
        .into_iter()
        .map(|r| r.result.unwrap().data)
        .collect();
    assert_eq!(names, vec![author_named(OFFLINE), author_named("Author")]);
    assert_eq!(exchange.stats().rollbacks, 1);
    let snapshot = exchange.snapshot();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(
        snapshot
            .records
            .values()
            .next()
            .and_then(|author| author.field("name"))
            .cloned(),
        Some(json!("Author"))
    );
}

#[tokio::test]
async fn speculative_values_never_reach_snapshots() {
    init_test_tracing();
    let transport = ScriptedTransport::new();
    transport.respond(&query_one(), query_one_data());
    transport.respond(&conceal_author(), conceal_author_data(ONLINE));
    transport.hold(&conceal_author());

    let exchange = Arc::new(
        CacheExchange::builder(transport.clone(), RecordingSink::new())
            .optimistic(conceal_resolvers())
            .build(),
    );
    exchange.execute(query_one()).await;
    let before = exchange.snapshot();

    let pending = {
        let exchange = Arc::clone(&exchange);
        tokio::spawn(async move { exchange.execute(conceal_author()).await })
    };
    while transport.calls_for(&conceal_author()) == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(exchange.snapshot(), before);
    assert_eq!(exchange.execute(query_one()).await.data, author_named(OFFLINE));

    transport.release(&conceal_author());
    pending.await.unwrap();
}

#[tokio::test]
async fn disabled_optimism_only_redelivers_the_response() {
    init_test_tracing();
    let transport = ScriptedTransport::new();
    transport.respond(&query_one(), query_one_data());
    transport.respond(&conceal_author(), conceal_author_data(ONLINE));

    let sink = RecordingSink::new();
    let exchange = CacheExchange::builder(transport, sink.clone())
        .optimistic(conceal_resolvers())
        .config(CacheConfig {
            optimistic: false,
            ..CacheConfig::default()
        })
        .build();

    exchange.execute(query_one()).await;
    exchange.execute(conceal_author()).await;

    let redelivered = sink.take();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(
        redelivered[0].result.as_ref().unwrap().data,
        author_named(ONLINE)
    );
    assert_eq!(exchange.stats().optimistic_writes, 0);
}
