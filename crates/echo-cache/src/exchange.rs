// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The cache exchange: per-operation read → forward → write cycle.
//!
//! All bookkeeping (store, dependency index, served-operation registry,
//! counters) sits behind one mutex. Each traversal, together with the
//! invalidation it triggers, runs under a single lock acquisition; the lock
//! is released before every transport await and before the sink is called.
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use echo_cache_core::{
    read_operation, write_operation, DependencyIndex, EntityKey, KeyRules, LayerId, Operation,
    OperationKey, OperationKind, Snapshot, Store, Touched, WriteMode,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::{CacheConfig, ConfigService, ConfigStore, StaleReadPolicy};
use crate::error::CacheError;
use crate::optimistic::OptimisticResolvers;
use crate::result::{CacheOutcome, OperationResult};
use crate::sink::{Redelivery, RedeliverySink};
use crate::stats::CacheStats;
use crate::transport::Transport;

#[derive(Debug, Default)]
struct CacheState {
    store: Store,
    deps: DependencyIndex,
    served: HashMap<OperationKey, Operation>,
    stats: CacheStats,
    last_layer: u64,
}

impl CacheState {
    fn next_layer(&mut self) -> LayerId {
        self.last_layer += 1;
        LayerId::from_raw(self.last_layer)
    }
}

/// Normalized cache in front of a [`Transport`].
///
/// Queries are answered from the store when every selected field resolves,
/// otherwise forwarded and their results written back. Every write computes
/// which previously served queries read the touched entities and hands each
/// a fresh result through the [`RedeliverySink`].
pub struct CacheExchange<T, S> {
    transport: T,
    sink: S,
    rules: KeyRules,
    resolvers: OptimisticResolvers,
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl<T, S> CacheExchange<T, S>
where
    T: Transport,
    S: RedeliverySink,
{
    /// Starts configuring an exchange over `transport`, redelivering into `sink`.
    pub fn builder(transport: T, sink: S) -> CacheExchangeBuilder<T, S> {
        CacheExchangeBuilder {
            transport,
            sink,
            rules: KeyRules::new(),
            resolvers: OptimisticResolvers::new(),
            config: CacheConfig::default(),
            snapshot: None,
        }
    }

    /// Executes `op`: queries may be served from the store, mutations are
    /// always forwarded.
    #[instrument(skip_all, fields(op = %op.key().short(), kind = %op.kind()))]
    pub async fn execute(&self, op: Operation) -> OperationResult {
        match op.kind() {
            OperationKind::Query => self.execute_query(op).await,
            OperationKind::Mutation => self.execute_mutation(op).await,
        }
    }

    /// Forgets `key`: it is dropped from the dependency index and will not be
    /// redelivered again. Returns `true` if it was known.
    #[instrument(skip_all, fields(op = %key.short()))]
    pub fn teardown(&self, key: &OperationKey) -> bool {
        let mut state = self.lock();
        let served = state.served.remove(key).is_some();
        let indexed = state.deps.remove(key);
        debug!(served, indexed, "operation torn down");
        served || indexed
    }

    /// Owned copy of the base tables.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().store.snapshot()
    }

    /// Saves a snapshot under the configured snapshot key.
    pub fn persist<C: ConfigStore>(&self, service: &ConfigService<C>) -> Result<(), CacheError> {
        let snapshot = self.snapshot();
        service.save(&self.config.snapshot_key, &snapshot)?;
        info!(
            records = snapshot.records.len(),
            links = snapshot.links.len(),
            key = %self.config.snapshot_key,
            "cache snapshot persisted"
        );
        Ok(())
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns `true` if `key` is registered for redelivery.
    pub fn is_served(&self, key: &OperationKey) -> bool {
        self.lock().served.contains_key(key)
    }

    /// Entities `key`'s last successful read depended on, if it is indexed.
    pub fn dependencies(&self, key: &OperationKey) -> Option<BTreeSet<EntityKey>> {
        self.lock().deps.entities_of(key).cloned()
    }

    async fn execute_query(&self, op: Operation) -> OperationResult {
        if let Some(hit) = self.read_cached(&op) {
            return hit;
        }
        debug!("cache miss; forwarding");
        let response = self.transport.forward(&op).await;
        self.complete_query(&op, response)
    }

    async fn execute_mutation(&self, op: Operation) -> OperationResult {
        let layer = self.apply_optimistic(&op);
        self.lock().stats.forwards += 1;
        let response = self.transport.forward(&op).await;
        self.complete_mutation(&op, layer, response)
    }

    fn read_cached(&self, op: &Operation) -> Option<OperationResult> {
        let mut state = self.lock();
        state.served.insert(op.key(), op.clone());
        let outcome = read_operation(state.store.tracked(), op);
        if let Some(data) = outcome.data {
            state.deps.replace(op.key(), outcome.touched.entities().cloned());
            state.stats.hits += 1;
            debug!("cache hit");
            return Some(OperationResult::hit(op.key(), data));
        }
        state.stats.misses += 1;
        state.stats.forwards += 1;
        None
    }

    fn complete_query(&self, op: &Operation, response: OperationResult) -> OperationResult {
        let mut response = response
            .with_key(op.key())
            .with_outcome(CacheOutcome::Miss);
        let Some(data) = response.data.take() else {
            warn!(error = ?response.error, "transport returned no data; nothing written");
            self.lock().stats.transport_failures += 1;
            return response;
        };

        let redeliveries = {
            let mut state = self.lock();
            let written = write_operation(
                state.store.tracked(),
                &self.rules,
                op,
                &data,
                WriteMode::Authoritative,
            );
            let readback = read_operation(state.store.tracked(), op);
            let entities: Vec<EntityKey> = if readback.is_hit() {
                readback.touched.entities().cloned().collect()
            } else {
                debug!("read-back missed; registering written entities");
                written.touched.entities().cloned().collect()
            };
            if state.served.contains_key(&op.key()) {
                state.deps.replace(op.key(), entities);
            } else {
                debug!("torn down while in flight; not registering");
            }
            response.data = Some(readback.data.unwrap_or(data));
            self.invalidate(&mut state, &written.touched, op.key())
        };
        self.emit(redeliveries);
        response
    }

    fn apply_optimistic(&self, op: &Operation) -> Option<LayerId> {
        if !self.config.optimistic || self.resolvers.is_empty() {
            return None;
        }
        let speculative = self.resolvers.resolve(op)?;
        let (layer, redeliveries) = {
            let mut state = self.lock();
            let layer = state.next_layer();
            let written = write_operation(
                state.store.tracked_layer(layer),
                &self.rules,
                op,
                &speculative,
                WriteMode::Speculative,
            );
            state.stats.optimistic_writes += 1;
            debug!(%layer, touched = written.touched.len(), "optimistic layer applied");
            let redeliveries = self.invalidate(&mut state, &written.touched, op.key());
            (layer, redeliveries)
        };
        self.emit(redeliveries);
        Some(layer)
    }

    fn complete_mutation(
        &self,
        op: &Operation,
        layer: Option<LayerId>,
        response: OperationResult,
    ) -> OperationResult {
        let response = response
            .with_key(op.key())
            .with_outcome(CacheOutcome::Miss);
        let redeliveries = {
            let mut state = self.lock();
            let mut touched = layer
                .map(|id| Touched::from_keys(state.store.discard_layer(id)))
                .unwrap_or_default();
            match response.data.as_ref() {
                Some(data) => {
                    let written = write_operation(
                        state.store.tracked(),
                        &self.rules,
                        op,
                        data,
                        WriteMode::Authoritative,
                    );
                    touched.extend(&written.touched);
                }
                None => {
                    warn!(error = ?response.error, "mutation failed; nothing written");
                    state.stats.transport_failures += 1;
                    if let Some(layer) = layer {
                        state.stats.rollbacks += 1;
                        debug!(%layer, "optimistic layer rolled back");
                    }
                }
            }
            self.invalidate(&mut state, &touched, op.key())
        };
        self.emit(redeliveries);
        response
    }

    /// Re-reads every dependent of `touched` other than `writer`.
    fn invalidate(
        &self,
        state: &mut CacheState,
        touched: &Touched,
        writer: OperationKey,
    ) -> Vec<Redelivery> {
        if !self.config.redelivery {
            return Vec::new();
        }
        let dependents = state.deps.dependents(touched.entities(), Some(&writer));
        trace!(touched = touched.len(), dependents = dependents.len(), "invalidation");
        let mut out = Vec::with_capacity(dependents.len());
        for key in dependents {
            let Some(operation) = state.served.get(&key).cloned() else {
                continue;
            };
            let outcome = read_operation(state.store.tracked(), &operation);
            match outcome.data {
                Some(data) => {
                    state.deps.replace(key, outcome.touched.entities().cloned());
                    state.stats.redeliveries += 1;
                    out.push(Redelivery {
                        operation,
                        result: Some(OperationResult::hit(key, data)),
                    });
                }
                None => match self.config.stale_read_policy {
                    StaleReadPolicy::Reforward => {
                        debug!(dependent = %key.short(), "re-read missed; asking host to re-execute");
                        state.stats.reforwards += 1;
                        out.push(Redelivery {
                            operation,
                            result: None,
                        });
                    }
                    StaleReadPolicy::Drop => {
                        debug!(dependent = %key.short(), "re-read missed; dropping redelivery");
                    }
                },
            }
        }
        out
    }

    fn emit(&self, redeliveries: Vec<Redelivery>) {
        for redelivery in redeliveries {
            self.sink.redeliver(redelivery);
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for [`CacheExchange`].
pub struct CacheExchangeBuilder<T, S> {
    transport: T,
    sink: S,
    rules: KeyRules,
    resolvers: OptimisticResolvers,
    config: CacheConfig,
    snapshot: Option<Snapshot>,
}

impl<T, S> CacheExchangeBuilder<T, S>
where
    T: Transport,
    S: RedeliverySink,
{
    /// Identification rules for payload objects.
    pub fn key_rules(mut self, rules: KeyRules) -> Self {
        self.rules = rules;
        self
    }

    /// Speculative mutation resolvers.
    pub fn optimistic(mut self, resolvers: OptimisticResolvers) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Replaces the default configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds the store from `snapshot`.
    pub fn snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Seeds the store from the snapshot persisted under the configured key,
    /// if there is one.
    pub fn load_snapshot<C: ConfigStore>(
        mut self,
        service: &ConfigService<C>,
    ) -> Result<Self, CacheError> {
        if let Some(snapshot) = service.load::<Snapshot>(&self.config.snapshot_key)? {
            snapshot.validate()?;
            info!(
                records = snapshot.records.len(),
                links = snapshot.links.len(),
                "cache snapshot loaded"
            );
            self.snapshot = Some(snapshot);
        }
        Ok(self)
    }

    /// Finishes the exchange.
    pub fn build(self) -> CacheExchange<T, S> {
        let store = self.snapshot.map(Store::from_snapshot).unwrap_or_default();
        CacheExchange {
            transport: self.transport,
            sink: self.sink,
            rules: self.rules,
            resolvers: self.resolvers,
            config: self.config,
            state: Mutex::new(CacheState {
                store,
                ..CacheState::default()
            }),
        }
    }
}
