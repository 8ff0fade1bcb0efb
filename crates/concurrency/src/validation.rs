//! Transaction validation for OCC
//!
//! Rules:
//! - First-committer-wins based on the READ-SET, not the write-set
//! - Blind writes (write without read) do not conflict
//! - A key read while absent conflicts if it exists at commit time
//! - Write skew is allowed

use cortex_storage::Shard;
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Commit number recorded for a key that was absent when read
pub const ABSENT: u64 = 0;

/// Types of conflicts found during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType<K> {
    /// Key was read at one commit, but storage now holds another
    ReadWriteConflict {
        /// The key that has a conflict
        key: K,
        /// Commit recorded in the read-set (`ABSENT` if the key was missing)
        read_commit: u64,
        /// Commit in storage at validation time (`ABSENT` if now missing)
        current_commit: u64,
    },
}

/// Result of transaction validation
///
/// A transaction commits only if `is_valid()` returns true.
#[derive(Debug, Clone)]
pub struct ValidationResult<K> {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType<K>>,
}

impl<K: Debug> ValidationResult<K> {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Create a validation result with a single conflict
    pub fn conflict(conflict: ConflictType<K>) -> Self {
        ValidationResult {
            conflicts: vec![conflict],
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult<K>) {
        self.conflicts.extend(other.conflicts);
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// Human-readable summary of the conflicting keys
    pub fn describe(&self) -> String {
        let keys: Vec<String> = self
            .conflicts
            .iter()
            .map(|c| match c {
                ConflictType::ReadWriteConflict {
                    key,
                    read_commit,
                    current_commit,
                } => format!("{:?} (read @{}, now @{})", key, read_commit, current_commit),
            })
            .collect();
        format!("concurrent modification of {}", keys.join(", "))
    }
}

/// Validate the read-set against the current state of a shard
///
/// # Arguments
/// * `read_set` - Keys read with the commit number observed at read time
/// * `shard` - Shard holding the keys, locked by the caller
///
/// # Returns
/// ValidationResult with any ReadWriteConflicts found
pub fn validate_read_set<K, R>(
    read_set: &FxHashMap<K, u64>,
    shard: &Shard<K, R>,
) -> ValidationResult<K>
where
    K: Hash + Eq + Clone + Debug,
{
    let mut result = ValidationResult::ok();

    for (key, read_commit) in read_set {
        let current_commit = shard.commit_of(key).unwrap_or(ABSENT);
        if current_commit != *read_commit {
            result.conflicts.push(ConflictType::ReadWriteConflict {
                key: key.clone(),
                read_commit: *read_commit,
                current_commit,
            });
        }
    }

    result
}
