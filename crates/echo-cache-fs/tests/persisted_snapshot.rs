// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! A cache persisted to disk seeds a fresh exchange that serves hits
//! without touching the transport.
#![allow(clippy::unwrap_used)]

use echo_cache::{CacheConfig, CacheExchange, CacheOutcome, ConfigService};
use echo_cache_dry_tests::{fixtures, RecordingSink, ScriptedTransport};
use echo_cache_fs::FsConfigStore;

#[tokio::test]
async fn snapshot_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let service = ConfigService::new(FsConfigStore::at(dir.path()).unwrap());

    let transport = ScriptedTransport::new();
    transport.respond(&fixtures::query_one(), fixtures::query_one_data());
    let first = CacheExchange::builder(transport.clone(), RecordingSink::new()).build();
    first.execute(fixtures::query_one()).await;
    first.persist(&service).unwrap();
    CacheConfig::default().save(&service).unwrap();

    let config = CacheConfig::load_or_default(&service).unwrap();
    let second_transport = ScriptedTransport::new();
    let second = CacheExchange::builder(second_transport.clone(), RecordingSink::new())
        .config(config)
        .load_snapshot(&service)
        .unwrap()
        .build();
    let result = second.execute(fixtures::query_one()).await;

    assert_eq!(result.cache_outcome(), CacheOutcome::Hit);
    assert_eq!(result.data, Some(fixtures::query_one_data()));
    assert_eq!(second_transport.calls(), 0);
    assert_eq!(second.snapshot(), first.snapshot());
}

#[test]
fn corrupt_snapshot_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsConfigStore::at(dir.path().join("cache")).unwrap();
    assert!(store.base().is_dir());
    std::fs::write(store.base().join("echo-cache-snapshot.json"), b"{not json").unwrap();
    let service = ConfigService::new(store);
    let err = CacheExchange::builder(ScriptedTransport::new(), RecordingSink::new())
        .load_snapshot(&service)
        .err()
        .unwrap();
    assert!(matches!(err, echo_cache::CacheError::Config(_)));
}
