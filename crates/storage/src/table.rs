//! Scope-sharded tables
//!
//! Replaces the hosted database's indexed tables with DashMap + FxHashMap.
//!
//! # Design
//!
//! - DashMap keyed by `Scope`: each memory space (and the global scope) is
//!   its own shard, so different spaces never contend
//! - FxHashMap within a shard: O(1) lookups by logical key
//! - Every stored entry carries a `StorageId` and a commit sequence number;
//!   the commit number is what optimistic transactions validate against
//! - Optional locator for tables whose keys are globally unique (fact ids,
//!   memory ids, conversation ids). It maps key -> owning scope so records
//!   can be found, and ownership checked, without knowing the space
//!
//! # Atomicity
//!
//! `with_shard_mut` runs a closure while holding the scope's write lock.
//! Everything a closure does to that shard is observed by other callers as a
//! single step. Closures must not call back into the same table.

use crate::error::StorageError;
use cortex_core::{Scope, StorageId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

/// A record plus its storage bookkeeping
#[derive(Debug, Clone)]
pub struct StoredEntry<R> {
    /// Storage-internal identity, stable across updates
    pub storage_id: StorageId,
    /// Commit sequence number of the last write to this entry
    pub commit: u64,
    /// The record
    pub record: R,
}

/// Records of one scope
#[derive(Debug)]
pub struct Shard<K, R> {
    data: FxHashMap<K, StoredEntry<R>>,
}

impl<K, R> Default for Shard<K, R> {
    fn default() -> Self {
        Self {
            data: FxHashMap::default(),
        }
    }
}

impl<K: Hash + Eq, R> Shard<K, R> {
    /// Get a record
    pub fn get(&self, key: &K) -> Option<&R> {
        self.data.get(key).map(|e| &e.record)
    }

    /// Get a record with its bookkeeping
    pub fn entry(&self, key: &K) -> Option<&StoredEntry<R>> {
        self.data.get(key)
    }

    /// Commit number of a key (None if absent)
    pub fn commit_of(&self, key: &K) -> Option<u64> {
        self.data.get(key).map(|e| e.commit)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &K) -> bool {
        self.data.contains_key(key)
    }

    /// Iterate over all records in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &R)> {
        self.data.iter().map(|(k, e)| (k, &e.record))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the shard is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Write view of one scope, held under the scope's lock
pub struct ShardMut<'a, K: Hash + Eq, R> {
    table: &'static str,
    scope: &'a Scope,
    shard: &'a mut Shard<K, R>,
    locator: Option<&'a DashMap<K, Scope>>,
    seq: &'a AtomicU64,
}

impl<'a, K, R> ShardMut<'a, K, R>
where
    K: Hash + Eq + Clone + Debug,
{
    /// Scope this view writes to
    pub fn scope(&self) -> &Scope {
        self.scope
    }

    /// Scope owning `key`, for tables with globally unique keys
    ///
    /// May name another scope. Always None for tables created with `new`.
    pub fn owner(&self, key: &K) -> Option<Scope> {
        self.locator.and_then(|l| l.get(key).map(|o| o.clone()))
    }

    /// Check that `insert(key, ..)` would not be refused
    pub fn check_insert(&self, key: &K) -> Result<(), StorageError> {
        if let Some(owner) = self.owner(key) {
            if &owner != self.scope {
                return Err(StorageError::KeyOwnedElsewhere {
                    table: self.table,
                    key: format!("{:?}", key),
                    owner,
                });
            }
        }
        Ok(())
    }

    /// Insert or replace a record
    ///
    /// Returns the previous record. For tables with globally unique keys,
    /// fails if another scope already owns the key.
    pub fn insert(&mut self, key: K, record: R) -> Result<Option<R>, StorageError> {
        if let Some(locator) = self.locator {
            match locator.entry(key.clone()) {
                Entry::Occupied(owner) => {
                    if owner.get() != self.scope {
                        return Err(StorageError::KeyOwnedElsewhere {
                            table: self.table,
                            key: format!("{:?}", key),
                            owner: owner.get().clone(),
                        });
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(self.scope.clone());
                }
            }
        }

        let commit = self.seq.fetch_add(1, Ordering::AcqRel) + 1;
        let storage_id = self
            .shard
            .data
            .get(&key)
            .map(|e| e.storage_id)
            .unwrap_or_default();
        let previous = self.shard.data.insert(
            key,
            StoredEntry {
                storage_id,
                commit,
                record,
            },
        );
        Ok(previous.map(|e| e.record))
    }

    /// Mutate an existing record in place
    ///
    /// Returns None if the key is absent. Bumps the entry's commit number.
    pub fn update<T>(&mut self, key: &K, f: impl FnOnce(&mut R) -> T) -> Option<T> {
        let entry = self.shard.data.get_mut(key)?;
        let out = f(&mut entry.record);
        entry.commit = self.seq.fetch_add(1, Ordering::AcqRel) + 1;
        Some(out)
    }

    /// Remove a record
    pub fn remove(&mut self, key: &K) -> Option<R> {
        let removed = self.shard.data.remove(key)?;
        if let Some(locator) = self.locator {
            locator.remove(key);
        }
        Some(removed.record)
    }

    /// Remove every record matching a predicate, returning them
    pub fn remove_where(&mut self, mut pred: impl FnMut(&K, &R) -> bool) -> Vec<(K, R)> {
        let keys: Vec<K> = self
            .shard
            .data
            .iter()
            .filter(|(k, e)| pred(k, &e.record))
            .map(|(k, _)| k.clone())
            .collect();

        keys.into_iter()
            .filter_map(|k| self.remove(&k).map(|r| (k, r)))
            .collect()
    }
}

impl<'a, K: Hash + Eq, R> Deref for ShardMut<'a, K, R> {
    type Target = Shard<K, R>;

    fn deref(&self) -> &Self::Target {
        self.shard
    }
}

/// Table of records sharded by scope
///
/// # Example
///
/// ```
/// use cortex_core::{MemorySpaceId, Scope};
/// use cortex_storage::Table;
///
/// let table: Table<String, u32> = Table::new("counters");
/// let scope = Scope::Space(MemorySpaceId::from("team-a"));
/// table.with_shard_mut(&scope, |shard| shard.insert("k".into(), 1)).unwrap();
/// assert_eq!(table.get(&scope, &"k".to_string()), Some(1));
/// ```
pub struct Table<K, R> {
    name: &'static str,
    shards: DashMap<Scope, Shard<K, R>>,
    locator: Option<DashMap<K, Scope>>,
    seq: AtomicU64,
}

impl<K, R> Table<K, R>
where
    K: Hash + Eq + Clone + Debug,
    R: Clone,
{
    /// Table whose keys are unique within a scope
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            shards: DashMap::new(),
            locator: None,
            seq: AtomicU64::new(0),
        }
    }

    /// Table whose keys are unique across all scopes
    pub fn with_global_keys(name: &'static str) -> Self {
        Self {
            name,
            shards: DashMap::new(),
            locator: Some(DashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Table name, used in logs and errors
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Highest commit number handed out so far
    pub fn commit_seq(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get a record by scope and key
    pub fn get(&self, scope: &Scope, key: &K) -> Option<R> {
        self.shards
            .get(scope)
            .and_then(|shard| shard.get(key).cloned())
    }

    /// Get a record together with its commit number
    pub fn get_with_commit(&self, scope: &Scope, key: &K) -> Option<(R, u64)> {
        self.shards.get(scope).and_then(|shard| {
            shard
                .entry(key)
                .map(|e| (e.record.clone(), e.commit))
        })
    }

    /// Check if a key exists in a scope
    pub fn contains(&self, scope: &Scope, key: &K) -> bool {
        self.shards
            .get(scope)
            .map(|shard| shard.contains(key))
            .unwrap_or(false)
    }

    /// Scope owning a globally unique key
    ///
    /// Always None for tables created with `new`.
    pub fn locate(&self, key: &K) -> Option<Scope> {
        self.locator
            .as_ref()
            .and_then(|locator| locator.get(key).map(|owner| owner.clone()))
    }

    /// Find a globally unique key, returning its scope and record
    pub fn find(&self, key: &K) -> Option<(Scope, R)> {
        let scope = self.locate(key)?;
        let record = self.get(&scope, key)?;
        Some((scope, record))
    }

    /// Clone every record of a scope matching a predicate
    pub fn scan(&self, scope: &Scope, mut pred: impl FnMut(&K, &R) -> bool) -> Vec<R> {
        self.shards
            .get(scope)
            .map(|shard| {
                shard
                    .iter()
                    .filter(|(k, r)| pred(k, r))
                    .map(|(_, r)| r.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clone every record in every scope matching a predicate
    pub fn scan_all(&self, mut pred: impl FnMut(&Scope, &R) -> bool) -> Vec<(Scope, R)> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            let scope = shard.key();
            for (_, record) in shard.value().iter() {
                if pred(scope, record) {
                    out.push((scope.clone(), record.clone()));
                }
            }
        }
        out
    }

    /// Run a read-only closure against a consistent view of one scope
    pub fn with_shard<T>(&self, scope: &Scope, f: impl FnOnce(&Shard<K, R>) -> T) -> T {
        match self.shards.get(scope) {
            Some(shard) => f(shard.value()),
            None => f(&Shard::default()),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Run a read-modify-write closure atomically against one scope
    pub fn with_shard_mut<T>(
        &self,
        scope: &Scope,
        f: impl FnOnce(&mut ShardMut<'_, K, R>) -> T,
    ) -> T {
        let mut guard = self.shards.entry(scope.clone()).or_default();
        let mut view = ShardMut {
            table: self.name,
            scope,
            shard: &mut *guard,
            locator: self.locator.as_ref(),
            seq: &self.seq,
        };
        f(&mut view)
    }

    /// Drop every record of a scope, returning how many were removed
    pub fn remove_scope(&self, scope: &Scope) -> usize {
        let Some((_, shard)) = self.shards.remove(scope) else {
            return 0;
        };
        if let Some(locator) = &self.locator {
            for key in shard.data.keys() {
                locator.remove(key);
            }
        }
        tracing::trace!(
            target: "cortex::storage",
            table = self.name,
            scope = %scope,
            removed = shard.len(),
            "scope dropped"
        );
        shard.len()
    }

    /// Drop every record in every scope
    pub fn clear(&self) -> usize {
        let removed = self.len();
        self.shards.clear();
        if let Some(locator) = &self.locator {
            locator.clear();
        }
        removed
    }

    // ========================================================================
    // Counts
    // ========================================================================

    /// Total number of records across scopes
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.value().len()).sum()
    }

    /// Check if the table has no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records in one scope
    pub fn scope_len(&self, scope: &Scope) -> usize {
        self.shards.get(scope).map(|s| s.len()).unwrap_or(0)
    }

    /// Scopes that currently hold a shard
    pub fn scopes(&self) -> Vec<Scope> {
        self.shards.iter().map(|s| s.key().clone()).collect()
    }
}

impl<K, R> Debug for Table<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("scopes", &self.shards.len())
            .field("global_keys", &self.locator.is_some())
            .field("commit_seq", &self.seq.load(Ordering::Acquire))
            .finish()
    }
}
