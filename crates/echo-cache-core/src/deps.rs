// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Entity → operation dependency index.
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::ident::{EntityKey, OperationKey};

#[derive(Debug, Clone)]
struct Registration {
    seq: u64,
    entities: BTreeSet<EntityKey>,
}

/// Which operations read which entities.
///
/// An operation's dependency set is *replaced* on every registration, never
/// merged. Each operation keeps the sequence number of its first
/// registration; [`DependencyIndex::dependents`] reports operations in that
/// order.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    by_entity: HashMap<EntityKey, HashSet<OperationKey>>,
    operations: HashMap<OperationKey, Registration>,
    next_seq: u64,
}

impl DependencyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces `op`'s dependency set with `entities`.
    pub fn replace(&mut self, op: OperationKey, entities: impl IntoIterator<Item = EntityKey>) {
        let entities: BTreeSet<EntityKey> = entities.into_iter().collect();
        let seq = match self.operations.remove(&op) {
            Some(existing) => {
                for key in &existing.entities {
                    self.unlink(key, &op);
                }
                existing.seq
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        for key in &entities {
            self.by_entity.entry(key.clone()).or_default().insert(op);
        }
        self.operations.insert(op, Registration { seq, entities });
    }

    /// Drops `op` from the index. Returns `true` if it was registered.
    pub fn remove(&mut self, op: &OperationKey) -> bool {
        let Some(registration) = self.operations.remove(op) else {
            return false;
        };
        for key in &registration.entities {
            self.unlink(key, op);
        }
        true
    }

    /// Operations (other than `exclude`) depending on any of `touched`,
    /// each once, in first-registration order.
    pub fn dependents<'a>(
        &self,
        touched: impl IntoIterator<Item = &'a EntityKey>,
        exclude: Option<&OperationKey>,
    ) -> Vec<OperationKey> {
        let mut found: HashSet<OperationKey> = HashSet::new();
        for key in touched {
            if let Some(ops) = self.by_entity.get(key) {
                found.extend(ops.iter().copied());
            }
        }
        if let Some(exclude) = exclude {
            found.remove(exclude);
        }
        let mut ordered: Vec<(u64, OperationKey)> = found
            .into_iter()
            .filter_map(|op| self.operations.get(&op).map(|r| (r.seq, op)))
            .collect();
        ordered.sort_unstable();
        ordered.into_iter().map(|(_, op)| op).collect()
    }

    /// Current dependency set of `op`.
    pub fn entities_of(&self, op: &OperationKey) -> Option<&BTreeSet<EntityKey>> {
        self.operations.get(op).map(|r| &r.entities)
    }

    /// Returns `true` if `op` is registered.
    pub fn contains(&self, op: &OperationKey) -> bool {
        self.operations.contains_key(op)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if no operation is registered.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn unlink(&mut self, key: &EntityKey, op: &OperationKey) {
        if let Some(ops) = self.by_entity.get_mut(key) {
            ops.remove(op);
            if ops.is_empty() {
                self.by_entity.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(n: u8) -> OperationKey {
        OperationKey([n; 32])
    }

    fn key(raw: &str) -> EntityKey {
        EntityKey::from_raw(raw)
    }

    #[test]
    fn dependents_follow_first_registration_order() {
        let mut index = DependencyIndex::new();
        index.replace(op(9), [key("A:1")]);
        index.replace(op(1), [key("A:1"), key("B:1")]);
        index.replace(op(5), [key("B:1")]);
        // Re-registering keeps the original position.
        index.replace(op(9), [key("B:1")]);

        let touched = [key("A:1"), key("B:1")];
        assert_eq!(index.dependents(&touched, None), vec![op(9), op(1), op(5)]);
        assert_eq!(index.dependents(&touched, Some(&op(1))), vec![op(9), op(5)]);
    }

    #[test]
    fn replace_drops_stale_dependencies() {
        let mut index = DependencyIndex::new();
        index.replace(op(1), [key("A:1")]);
        index.replace(op(1), [key("B:1")]);
        assert!(index.dependents(&[key("A:1")], None).is_empty());
        assert_eq!(index.dependents(&[key("B:1")], None), vec![op(1)]);
    }

    #[test]
    fn remove_prunes_every_entity() {
        let mut index = DependencyIndex::new();
        index.replace(op(1), [key("A:1"), key("B:1")]);
        assert!(index.remove(&op(1)));
        assert!(!index.remove(&op(1)));
        assert!(index.is_empty());
        assert!(index.dependents(&[key("A:1"), key("B:1")], None).is_empty());
    }

    #[test]
    fn no_overlap_no_dependents() {
        let mut index = DependencyIndex::new();
        index.replace(op(1), [key("Author:123")]);
        assert!(index.dependents(&[key("User:me")], None).is_empty());
    }
}
