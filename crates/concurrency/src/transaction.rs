//! Transaction context
//!
//! A `TransactionContext` stages writes for one scope of one table:
//! - reads go through the overlay first (read-your-writes), then storage,
//!   recording the commit number observed
//! - `put` / `delete` only touch the overlay
//! - `commit` takes the scope's lock, validates the read-set, checks every
//!   staged insert is allowed, then applies all writes
//!
//! Nothing reaches storage unless every check passes. Dropping a context
//! without committing discards it.

use crate::validation::{validate_read_set, ABSENT};
use cortex_core::{CortexError, CortexResult, Scope};
use cortex_storage::Table;
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Counts of what a successful commit applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitSummary {
    /// Records inserted or replaced
    pub puts: usize,
    /// Records removed
    pub deletes: usize,
}

/// Staged, uncommitted batch of writes against one scope
#[derive(Debug)]
pub struct TransactionContext<K, R> {
    scope: Scope,
    read_set: FxHashMap<K, u64>,
    /// Staged writes; None marks a delete
    writes: FxHashMap<K, Option<R>>,
    /// Keys in first-write order, so commits apply deterministically
    order: Vec<K>,
}

impl<K, R> TransactionContext<K, R>
where
    K: Hash + Eq + Clone + Debug,
    R: Clone,
{
    /// Start a transaction against `scope`
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            read_set: FxHashMap::default(),
            writes: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Scope this transaction writes to
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Read a key, seeing this transaction's own staged writes
    pub fn read(&mut self, table: &Table<K, R>, key: &K) -> Option<R> {
        if let Some(staged) = self.writes.get(key) {
            return staged.clone();
        }

        match table.get_with_commit(&self.scope, key) {
            Some((record, commit)) => {
                self.read_set.entry(key.clone()).or_insert(commit);
                Some(record)
            }
            None => {
                self.read_set.entry(key.clone()).or_insert(ABSENT);
                None
            }
        }
    }

    /// Stage an insert or replace
    pub fn put(&mut self, key: K, record: R) {
        self.stage(key, Some(record));
    }

    /// Stage a delete
    pub fn delete(&mut self, key: K) {
        self.stage(key, None);
    }

    /// Number of keys with staged writes
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// True if nothing has been staged
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Validate and apply every staged write atomically
    ///
    /// # Errors
    ///
    /// - `CONFLICT` if any key in the read-set changed since it was read
    /// - `PERMISSION_DENIED` if a staged insert targets a key owned by another
    ///   scope (tables with global keys only)
    pub fn commit(mut self, table: &Table<K, R>) -> CortexResult<CommitSummary> {
        let scope = self.scope.clone();
        table.with_shard_mut(&scope, |shard| {
            let validation = validate_read_set(&self.read_set, shard);
            if !validation.is_valid() {
                tracing::debug!(
                    target: "cortex::concurrency",
                    table = table.name(),
                    scope = %scope,
                    conflicts = validation.conflict_count(),
                    "transaction aborted"
                );
                return Err(CortexError::conflict(validation.describe()));
            }

            for key in &self.order {
                if let Some(Some(_)) = self.writes.get(key) {
                    shard.check_insert(key)?;
                }
            }

            let mut summary = CommitSummary::default();
            for key in self.order.drain(..) {
                match self.writes.remove(&key) {
                    Some(Some(record)) => {
                        shard.insert(key, record)?;
                        summary.puts += 1;
                    }
                    Some(None) => {
                        if shard.remove(&key).is_some() {
                            summary.deletes += 1;
                        }
                    }
                    None => {}
                }
            }
            Ok(summary)
        })
    }

    fn stage(&mut self, key: K, value: Option<R>) {
        if !self.writes.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.writes.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::{ErrorCode, MemorySpaceId};
    use std::sync::Arc;
    use std::thread;

    fn scope() -> Scope {
        Scope::Space(MemorySpaceId::from("s"))
    }

    fn seeded() -> Table<String, i64> {
        let table = Table::new("t");
        table.with_shard_mut(&scope(), |s| {
            s.insert("a".to_string(), 1).unwrap();
            s.insert("b".to_string(), 2).unwrap();
        });
        table
    }

    #[test]
    fn test_commit_applies_all_writes() {
        let table = seeded();
        let mut txn = TransactionContext::new(scope());
        let a = txn.read(&table, &"a".to_string()).unwrap();
        txn.put("a".to_string(), a + 10);
        txn.put("c".to_string(), 3);
        txn.delete("b".to_string());

        let summary = txn.commit(&table).unwrap();
        assert_eq!(summary, CommitSummary { puts: 2, deletes: 1 });
        assert_eq!(table.get(&scope(), &"a".to_string()), Some(11));
        assert_eq!(table.get(&scope(), &"c".to_string()), Some(3));
        assert_eq!(table.get(&scope(), &"b".to_string()), None);
    }

    #[test]
    fn test_read_your_writes() {
        let table = seeded();
        let mut txn = TransactionContext::new(scope());
        txn.put("a".to_string(), 100);
        assert_eq!(txn.read(&table, &"a".to_string()), Some(100));
        txn.delete("a".to_string());
        assert_eq!(txn.read(&table, &"a".to_string()), None);
        // Storage untouched until commit
        assert_eq!(table.get(&scope(), &"a".to_string()), Some(1));
    }

    #[test]
    fn test_conflict_leaves_storage_untouched() {
        let table = seeded();
        let mut txn = TransactionContext::new(scope());
        let a = txn.read(&table, &"a".to_string()).unwrap();
        txn.put("a".to_string(), a + 1);
        txn.put("b".to_string(), 99);

        // Concurrent writer commits first
        table
            .with_shard_mut(&scope(), |s| s.insert("a".to_string(), 50))
            .unwrap();

        let err = txn.commit(&table).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(table.get(&scope(), &"a".to_string()), Some(50));
        assert_eq!(table.get(&scope(), &"b".to_string()), Some(2));
    }

    #[test]
    fn test_blind_writes_do_not_conflict() {
        let table = seeded();
        let mut txn = TransactionContext::new(scope());
        txn.put("a".to_string(), 7);
        table
            .with_shard_mut(&scope(), |s| s.insert("a".to_string(), 50))
            .unwrap();
        assert!(txn.commit(&table).is_ok());
        assert_eq!(table.get(&scope(), &"a".to_string()), Some(7));
    }

    #[test]
    fn test_global_key_owned_elsewhere_aborts_whole_batch() {
        let table: Table<String, i64> = Table::with_global_keys("g");
        let other = Scope::Space(MemorySpaceId::from("other"));
        table
            .with_shard_mut(&other, |s| s.insert("taken".to_string(), 1))
            .unwrap();

        let mut txn = TransactionContext::new(scope());
        txn.put("fresh".to_string(), 1);
        txn.put("taken".to_string(), 2);
        let err = txn.commit(&table).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert_eq!(table.get(&scope(), &"fresh".to_string()), None);
    }

    #[test]
    fn test_concurrent_increments_never_lose_updates() {
        let table = Arc::new(seeded());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    let mut applied = 0;
                    while applied < 100 {
                        let mut txn = TransactionContext::new(scope());
                        let v = txn.read(&table, &"a".to_string()).unwrap();
                        txn.put("a".to_string(), v + 1);
                        if txn.commit(&table).is_ok() {
                            applied += 1;
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(table.get(&scope(), &"a".to_string()), Some(401));
    }
}
