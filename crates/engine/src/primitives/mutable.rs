//! Mutable key-value store
//!
//! Live values addressed by `(namespace, key)` within a memory space.
//! Last write wins and no history is kept.
//!
//! Atomic operators (`increment`, `decrement`, `append`, custom
//! `update_with`) run as one read-modify-write under the space's lock.
//! `transaction` stages a batch of operations on a private overlay, checks
//! every precondition, then commits all of them or none.

use std::sync::Arc;

use cortex_concurrency::TransactionContext;
use cortex_core::{
    CortexError, CortexResult, EntityRef, JsonValue, MemorySpaceId, Metadata, Millis, NumericValue,
    Scope,
};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::validation;

/// Composite key of a mutable entry within its space
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MutableKey {
    /// Namespace, e.g. "counters"
    pub namespace: String,
    /// Key within the namespace
    pub key: String,
}

impl MutableKey {
    /// Create a key
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }
}

/// A live mutable entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutableRecord {
    /// Owning space
    pub memory_space_id: MemorySpaceId,
    /// Namespace
    pub namespace: String,
    /// Key within the namespace
    pub key: String,
    /// Current value
    pub value: JsonValue,
    /// User the entry belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Caller metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// First write
    pub created_at: Millis,
    /// Last write
    pub updated_at: Millis,
}

/// Extra fields for `set`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptions {
    /// User the entry belongs to
    pub user_id: Option<String>,
    /// Caller metadata
    pub metadata: Option<Metadata>,
}

/// Relative update applied to an existing value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "operand", rename_all = "lowercase")]
pub enum UpdateOp {
    /// Add a number
    Increment(JsonValue),
    /// Subtract a number
    Decrement(JsonValue),
    /// Push an element onto an array
    Append(JsonValue),
}

impl UpdateOp {
    /// Compute the new value from the current one
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` if an arithmetic operand is not a number, or the
    ///   result overflows or is not finite
    /// - `TYPE_MISMATCH` if the current value has the wrong shape
    pub fn apply(&self, current: &JsonValue) -> CortexResult<JsonValue> {
        match self {
            UpdateOp::Increment(operand) => arithmetic(current, operand, false),
            UpdateOp::Decrement(operand) => arithmetic(current, operand, true),
            UpdateOp::Append(element) => match current.as_inner() {
                serde_json::Value::Array(items) => {
                    let mut items = items.clone();
                    items.push(element.as_inner().clone());
                    Ok(JsonValue::from(serde_json::Value::Array(items)))
                }
                _ => Err(CortexError::type_mismatch("array", current.type_name())),
            },
        }
    }
}

fn arithmetic(current: &JsonValue, operand: &JsonValue, subtract: bool) -> CortexResult<JsonValue> {
    let delta = operand.as_numeric().ok_or_else(|| {
        CortexError::invalid_input(format!("operand must be a number, got {}", operand.type_name()))
    })?;
    let base = current
        .as_numeric()
        .ok_or_else(|| CortexError::type_mismatch("number", current.type_name()))?;

    let result = match (base, delta) {
        (NumericValue::Int(a), NumericValue::Int(b)) => {
            let out = if subtract { a.checked_sub(b) } else { a.checked_add(b) };
            NumericValue::Int(out.ok_or_else(|| CortexError::invalid_input("integer overflow"))?)
        }
        (a, b) => {
            let out = if subtract {
                a.as_f64() - b.as_f64()
            } else {
                a.as_f64() + b.as_f64()
            };
            if !out.is_finite() {
                return Err(CortexError::invalid_input("result is not a finite number"));
            }
            NumericValue::Float(out)
        }
    };
    Ok(JsonValue::from_numeric(result))
}

/// One operation of a `transaction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionOp {
    /// Upsert a value
    Set {
        /// Namespace
        namespace: String,
        /// Key
        key: String,
        /// New value
        value: JsonValue,
    },
    /// Apply a relative update to an existing value
    Update {
        /// Namespace
        namespace: String,
        /// Key
        key: String,
        /// The update
        #[serde(flatten)]
        op: UpdateOp,
    },
    /// Delete an existing value
    Delete {
        /// Namespace
        namespace: String,
        /// Key
        key: String,
    },
}

/// Outcome of a committed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Operations executed
    pub operations: usize,
    /// Keys written (set or updated)
    pub written: usize,
    /// Keys deleted
    pub deleted: usize,
    /// Final value of each written key, in first-write order
    pub records: Vec<MutableRecord>,
}

/// Filter for listing and counting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutableFilter {
    /// Only this namespace
    pub namespace: Option<String>,
    /// Only keys starting with this prefix
    pub key_prefix: Option<String>,
    /// Only entries of this user
    pub user_id: Option<String>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl MutableFilter {
    fn matches(&self, record: &MutableRecord) -> bool {
        self.namespace.as_ref().map_or(true, |n| &record.namespace == n)
            && self
                .key_prefix
                .as_ref()
                .map_or(true, |p| record.key.starts_with(p.as_str()))
            && self
                .user_id
                .as_ref()
                .map_or(true, |u| record.user_id.as_ref() == Some(u))
    }
}

/// Mutable key-value store
#[derive(Clone)]
pub struct MutableStore {
    db: Arc<Database>,
}

impl MutableStore {
    /// Create a new mutable store facade
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn validate_key(&self, space: &MemorySpaceId, namespace: &str, key: &str) -> CortexResult<()> {
        let limits = self.db.limits();
        validation::validate_space(space, &limits)?;
        validation::validate_segment("namespace", namespace, &limits)?;
        validation::validate_id("key", key, &limits)
    }

    fn not_found(space: &MemorySpaceId, namespace: &str, key: &str) -> CortexError {
        CortexError::not_found(EntityRef::mutable(space, namespace, key))
    }

    fn build(
        space: &MemorySpaceId,
        key: &MutableKey,
        existing: Option<MutableRecord>,
        value: JsonValue,
        options: SetOptions,
        now: Millis,
    ) -> MutableRecord {
        match existing {
            Some(mut record) => {
                record.value = value;
                if options.user_id.is_some() {
                    record.user_id = options.user_id;
                }
                if options.metadata.is_some() {
                    record.metadata = options.metadata;
                }
                record.updated_at = now;
                record
            }
            None => MutableRecord {
                memory_space_id: space.clone(),
                namespace: key.namespace.clone(),
                key: key.key.clone(),
                value,
                user_id: options.user_id,
                metadata: options.metadata,
                created_at: now,
                updated_at: now,
            },
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Upsert a value
    pub fn set(
        &self,
        space: &MemorySpaceId,
        namespace: &str,
        key: &str,
        value: JsonValue,
        options: SetOptions,
    ) -> CortexResult<MutableRecord> {
        self.db.guard_write(space)?;
        self.validate_key(space, namespace, key)?;
        validation::validate_payload("value", &value, &self.db.limits())?;

        let now = self.db.now();
        let mkey = MutableKey::new(namespace, key);
        let record = self
            .db
            .tables
            .mutable
            .with_shard_mut(&Scope::from(space), |shard| -> CortexResult<MutableRecord> {
                let existing = shard.get(&mkey).cloned();
                let record = Self::build(space, &mkey, existing, value, options, now);
                shard.insert(mkey.clone(), record.clone())?;
                Ok(record)
            })?;

        tracing::debug!(
            target: "cortex::mutable",
            memory_space = %space,
            namespace,
            key,
            "value set"
        );
        Ok(record)
    }

    /// Apply a relative update to an existing value
    ///
    /// # Errors
    ///
    /// - `NOT_FOUND` if the key does not exist
    /// - `TYPE_MISMATCH` / `VALIDATION_ERROR` as described on `UpdateOp::apply`
    pub fn update(&self, space: &MemorySpaceId, namespace: &str, key: &str, op: UpdateOp) -> CortexResult<MutableRecord> {
        self.update_with(space, namespace, key, |current| op.apply(current))
    }

    /// Replace an existing value with `f(current)`, atomically
    ///
    /// `f` runs under the space's lock and must not call back into the
    /// mutable store.
    pub fn update_with(
        &self,
        space: &MemorySpaceId,
        namespace: &str,
        key: &str,
        f: impl FnOnce(&JsonValue) -> CortexResult<JsonValue>,
    ) -> CortexResult<MutableRecord> {
        self.db.guard_write(space)?;
        self.validate_key(space, namespace, key)?;
        let limits = self.db.limits();

        let now = self.db.now();
        let mkey = MutableKey::new(namespace, key);
        let record = self
            .db
            .tables
            .mutable
            .with_shard_mut(&Scope::from(space), |shard| {
                let current = shard
                    .get(&mkey)
                    .ok_or_else(|| Self::not_found(space, namespace, key))?;
                let next = f(&current.value)?;
                validation::validate_payload("value", &next, &limits)?;
                shard
                    .update(&mkey, |r| {
                        r.value = next;
                        r.updated_at = now;
                        r.clone()
                    })
                    .ok_or_else(|| Self::not_found(space, namespace, key))
            })?;

        tracing::debug!(
            target: "cortex::mutable",
            memory_space = %space,
            namespace,
            key,
            "value updated"
        );
        Ok(record)
    }

    /// Add `amount` to a numeric value
    pub fn increment(&self, space: &MemorySpaceId, namespace: &str, key: &str, amount: impl Into<JsonValue>) -> CortexResult<MutableRecord> {
        self.update(space, namespace, key, UpdateOp::Increment(amount.into()))
    }

    /// Subtract `amount` from a numeric value
    pub fn decrement(&self, space: &MemorySpaceId, namespace: &str, key: &str, amount: impl Into<JsonValue>) -> CortexResult<MutableRecord> {
        self.update(space, namespace, key, UpdateOp::Decrement(amount.into()))
    }

    /// Push an element onto an array value
    pub fn append(&self, space: &MemorySpaceId, namespace: &str, key: &str, element: impl Into<JsonValue>) -> CortexResult<MutableRecord> {
        self.update(space, namespace, key, UpdateOp::Append(element.into()))
    }

    /// Delete a value
    ///
    /// Fails with `NOT_FOUND` if the key does not exist.
    pub fn delete(&self, space: &MemorySpaceId, namespace: &str, key: &str) -> CortexResult<MutableRecord> {
        self.db.guard_write(space)?;
        let removed = self
            .db
            .tables
            .mutable
            .with_shard_mut(&Scope::from(space), |shard| {
                shard.remove(&MutableKey::new(namespace, key))
            })
            .ok_or_else(|| Self::not_found(space, namespace, key))?;
        tracing::debug!(
            target: "cortex::mutable",
            memory_space = %space,
            namespace,
            key,
            "value deleted"
        );
        Ok(removed)
    }

    /// Delete every value in a namespace
    pub fn purge_namespace(&self, space: &MemorySpaceId, namespace: &str) -> CortexResult<usize> {
        self.db.guard_write(space)?;
        let removed = self
            .db
            .tables
            .mutable
            .with_shard_mut(&Scope::from(space), |shard| {
                shard.remove_where(|k, _| k.namespace == namespace)
            })
            .len();
        tracing::debug!(
            target: "cortex::mutable",
            memory_space = %space,
            namespace,
            removed,
            "namespace purged"
        );
        Ok(removed)
    }

    /// Remove every mutable value in every space
    ///
    /// Only permitted in Dev and Test environments.
    pub fn purge_all(&self) -> CortexResult<usize> {
        self.db.require_destructive("mutable.purge_all")?;
        let removed = self.db.tables.mutable.clear();
        tracing::info!(target: "cortex::mutable", removed, "all values purged");
        Ok(removed)
    }

    /// Run a batch of operations all-or-nothing
    ///
    /// Every operation is staged and checked first (validation, existence,
    /// operator type). Then the batch commits in one step, provided no key it
    /// read was changed by another writer in the meantime.
    ///
    /// # Errors
    ///
    /// - any error of the individual operations, with nothing written
    /// - `CONFLICT` if a concurrent writer changed a key the batch read
    /// - `VALIDATION_ERROR` if the batch is empty or too large
    pub fn transaction(&self, space: &MemorySpaceId, ops: Vec<TransactionOp>) -> CortexResult<TransactionResult> {
        self.db.guard_write(space)?;
        let limits = self.db.limits();
        if ops.is_empty() {
            return Err(CortexError::invalid_input("transaction has no operations"));
        }
        if ops.len() > limits.max_batch_ops {
            return Err(CortexError::invalid_input(format!(
                "transaction has {} operations, limit is {}",
                ops.len(),
                limits.max_batch_ops
            )));
        }

        let now = self.db.now();
        let table = &self.db.tables.mutable;
        let operations = ops.len();
        let mut txn = TransactionContext::new(Scope::from(space));
        let mut written: Vec<MutableKey> = Vec::new();

        for op in ops {
            match op {
                TransactionOp::Set { namespace, key, value } => {
                    self.validate_key(space, &namespace, &key)?;
                    validation::validate_payload("value", &value, &limits)?;
                    let mkey = MutableKey::new(namespace, key);
                    let existing = txn.read(table, &mkey);
                    let record = Self::build(space, &mkey, existing, value, SetOptions::default(), now);
                    txn.put(mkey.clone(), record);
                    if !written.contains(&mkey) {
                        written.push(mkey);
                    }
                }
                TransactionOp::Update { namespace, key, op } => {
                    self.validate_key(space, &namespace, &key)?;
                    let mkey = MutableKey::new(namespace, key);
                    let mut record = txn
                        .read(table, &mkey)
                        .ok_or_else(|| Self::not_found(space, &mkey.namespace, &mkey.key))?;
                    record.value = op.apply(&record.value)?;
                    validation::validate_payload("value", &record.value, &limits)?;
                    record.updated_at = now;
                    txn.put(mkey.clone(), record);
                    if !written.contains(&mkey) {
                        written.push(mkey);
                    }
                }
                TransactionOp::Delete { namespace, key } => {
                    let mkey = MutableKey::new(namespace, key);
                    txn.read(table, &mkey)
                        .ok_or_else(|| Self::not_found(space, &mkey.namespace, &mkey.key))?;
                    txn.delete(mkey.clone());
                    written.retain(|k| k != &mkey);
                }
            }
        }

        let records: Vec<MutableRecord> = written
            .iter()
            .filter_map(|k| txn.read(table, k))
            .collect();
        let summary = txn.commit(table)?;

        tracing::debug!(
            target: "cortex::mutable",
            memory_space = %space,
            operations,
            puts = summary.puts,
            deletes = summary.deletes,
            "transaction committed"
        );
        Ok(TransactionResult {
            operations,
            written: summary.puts,
            deleted: summary.deletes,
            records,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get an entry
    pub fn get(&self, space: &MemorySpaceId, namespace: &str, key: &str) -> CortexResult<Option<MutableRecord>> {
        Ok(self
            .db
            .tables
            .mutable
            .get(&Scope::from(space), &MutableKey::new(namespace, key)))
    }

    /// Get just the value
    pub fn get_value(&self, space: &MemorySpaceId, namespace: &str, key: &str) -> CortexResult<Option<JsonValue>> {
        Ok(self.get(space, namespace, key)?.map(|r| r.value))
    }

    /// Check if a key exists
    pub fn exists(&self, space: &MemorySpaceId, namespace: &str, key: &str) -> CortexResult<bool> {
        Ok(self
            .db
            .tables
            .mutable
            .contains(&Scope::from(space), &MutableKey::new(namespace, key)))
    }

    /// Entries ordered by namespace, then key
    pub fn list(&self, space: &MemorySpaceId, filter: &MutableFilter) -> CortexResult<Vec<MutableRecord>> {
        let mut records = self
            .db
            .tables
            .mutable
            .scan(&Scope::from(space), |_, r| filter.matches(r));
        records.sort_by(|a, b| (&a.namespace, &a.key).cmp(&(&b.namespace, &b.key)));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Number of entries matching a filter
    pub fn count(&self, space: &MemorySpaceId, filter: &MutableFilter) -> CortexResult<usize> {
        Ok(self
            .db
            .tables
            .mutable
            .with_shard(&Scope::from(space), |shard| {
                shard.iter().filter(|(_, r)| filter.matches(r)).count()
            }))
    }
}
