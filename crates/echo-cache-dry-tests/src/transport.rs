// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scripted transport double.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use echo_cache::{OperationResult, Transport};
use echo_cache_core::{Operation, OperationKey};
use serde_json::Value;
use tokio::sync::Semaphore;

#[derive(Clone)]
enum Scripted {
    Data(Value),
    Fail(String),
}

#[derive(Default)]
struct ScriptedInner {
    responses: HashMap<OperationKey, Scripted>,
    gates: HashMap<OperationKey, Arc<Semaphore>>,
    calls: Vec<OperationKey>,
}

/// Transport that answers from a per-operation script.
///
/// Responses are looked up when a forward completes, so a test may change
/// the script while a forward is held. Operations without a script fail
/// with an error result.
///
/// [`ScriptedTransport::hold`] makes every later forward of an operation
/// wait until [`ScriptedTransport::release`] is called once per forward;
/// this is how tests observe state between "sent" and "answered".
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<ScriptedInner>>,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `op` with `data`.
    pub fn respond(&self, op: &Operation, data: Value) {
        self.lock().responses.insert(op.key(), Scripted::Data(data));
    }

    /// Answers `op` with a transport error carrying `message`.
    pub fn fail(&self, op: &Operation, message: &str) {
        self.lock()
            .responses
            .insert(op.key(), Scripted::Fail(message.to_owned()));
    }

    /// Holds forwards of `op` until released.
    pub fn hold(&self, op: &Operation) {
        self.lock()
            .gates
            .entry(op.key())
            .or_insert_with(|| Arc::new(Semaphore::new(0)));
    }

    /// Lets one held forward of `op` complete.
    pub fn release(&self, op: &Operation) {
        if let Some(gate) = self.lock().gates.get(&op.key()) {
            gate.add_permits(1);
        }
    }

    /// Total number of forwards.
    pub fn calls(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of forwards of `op`.
    pub fn calls_for(&self, op: &Operation) -> usize {
        let key = op.key();
        self.lock().calls.iter().filter(|k| **k == key).count()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for ScriptedTransport {
    fn forward(&self, op: &Operation) -> impl Future<Output = OperationResult> + Send {
        let key = op.key();
        let gate = {
            let mut inner = self.lock();
            inner.calls.push(key);
            inner.gates.get(&key).cloned()
        };
        let inner = Arc::clone(&self.inner);
        async move {
            if let Some(gate) = gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            let scripted = inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .responses
                .get(&key)
                .cloned();
            match scripted {
                Some(Scripted::Data(data)) => OperationResult::data(key, data),
                Some(Scripted::Fail(message)) => OperationResult::error(key, anyhow!(message)),
                None => OperationResult::error(key, anyhow!("no scripted response for {}", key.short())),
            }
        }
    }
}
