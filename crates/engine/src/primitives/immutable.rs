//! Versioned immutable records
//!
//! Records are addressed by `(record_type, id)` within a scope: a memory
//! space, or the global scope when no space is given. Storing over an
//! existing key archives the current value and bumps the version; the
//! identity never changes.
//!
//! # Example
//!
//! ```
//! use cortex_core::{JsonValue, MemorySpaceId};
//! use cortex_engine::{Database, ImmutableEntry, ImmutableStore};
//!
//! let store = ImmutableStore::new(Database::ephemeral());
//! let space = MemorySpaceId::from("team-a");
//! let data: JsonValue = r#"{"v":1}"#.parse().unwrap();
//! let rec = store.store(Some(&space), ImmutableEntry::new("policy", "p1", data)).unwrap();
//! assert_eq!(rec.history.version, 1);
//! ```

use std::sync::Arc;

use cortex_core::{CortexError, CortexResult, EntityRef, JsonValue, MemorySpaceId, Metadata, Millis, Scope};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::primitives::versioned::{PurgeVersionsResult, VersionHistory, Versioned};
use crate::validation;

/// Composite key of an immutable record within its scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImmutableKey {
    /// Record type, e.g. "policy"
    pub record_type: String,
    /// Id within the type
    pub id: String,
}

impl ImmutableKey {
    /// Create a key
    pub fn new(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            id: id.into(),
        }
    }
}

/// A stored immutable record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmutableRecord {
    /// Record type
    pub record_type: String,
    /// Id within the type
    pub id: String,
    /// Owning space, None for global records
    pub memory_space_id: Option<MemorySpaceId>,
    /// Current value
    pub data: JsonValue,
    /// User the record belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Caller metadata for the current version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Creation time
    pub created_at: Millis,
    /// When the current version was stored
    pub updated_at: Millis,
    /// Version and prior values
    #[serde(flatten)]
    pub history: VersionHistory<JsonValue>,
}

impl Versioned for ImmutableRecord {
    type Snapshot = JsonValue;

    fn history(&self) -> &VersionHistory<JsonValue> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut VersionHistory<JsonValue> {
        &mut self.history
    }

    fn snapshot(&self) -> JsonValue {
        self.data.clone()
    }

    fn apply_snapshot(&mut self, data: &JsonValue) {
        self.data = data.clone();
    }

    fn created_at(&self) -> Millis {
        self.created_at
    }

    fn updated_at(&self) -> Millis {
        self.updated_at
    }

    fn set_updated_at(&mut self, t: Millis) {
        self.updated_at = t;
    }

    fn snapshot_metadata(&self) -> Option<Metadata> {
        self.metadata.clone()
    }
}

impl ImmutableRecord {
    /// Storage key of this record
    pub fn key(&self) -> ImmutableKey {
        ImmutableKey::new(self.record_type.clone(), self.id.clone())
    }
}

/// Input to `ImmutableStore::store`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmutableEntry {
    /// Record type
    pub record_type: String,
    /// Id within the type
    pub id: String,
    /// New value
    pub data: JsonValue,
    /// User the record belongs to
    #[serde(default)]
    pub user_id: Option<String>,
    /// Metadata for this version
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl ImmutableEntry {
    /// Entry with no user or metadata
    pub fn new(record_type: impl Into<String>, id: impl Into<String>, data: JsonValue) -> Self {
        Self {
            record_type: record_type.into(),
            id: id.into(),
            data,
            user_id: None,
            metadata: None,
        }
    }

    /// Attach a user id
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Filter for listing, counting and bulk purging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImmutableFilter {
    /// Only records of this type
    pub record_type: Option<String>,
    /// Only records of this user
    pub user_id: Option<String>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl ImmutableFilter {
    fn matches(&self, record: &ImmutableRecord) -> bool {
        self.record_type
            .as_ref()
            .map_or(true, |t| &record.record_type == t)
            && self
                .user_id
                .as_ref()
                .map_or(true, |u| record.user_id.as_ref() == Some(u))
    }
}

/// Versioned record store
#[derive(Clone)]
pub struct ImmutableStore {
    db: Arc<Database>,
}

impl ImmutableStore {
    /// Create a new immutable store facade
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn guard(&self, space: Option<&MemorySpaceId>) -> CortexResult<()> {
        match space {
            Some(space) => self.db.guard_write(space),
            None => self.db.require_writable(),
        }
    }

    fn validate_entry(&self, space: Option<&MemorySpaceId>, entry: &ImmutableEntry) -> CortexResult<()> {
        let limits = self.db.limits();
        if let Some(space) = space {
            validation::validate_space(space, &limits)?;
        }
        validation::validate_segment("record_type", &entry.record_type, &limits)?;
        validation::validate_id("id", &entry.id, &limits)?;
        validation::validate_payload("data", &entry.data, &limits)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a value
    ///
    /// Creates version 1 if the key is new. Otherwise archives the current
    /// value (with its original `updated_at`) and stores `entry.data` as the
    /// next version.
    pub fn store(&self, space: Option<&MemorySpaceId>, entry: ImmutableEntry) -> CortexResult<ImmutableRecord> {
        self.store_inner(space, entry, None)
    }

    /// Store a value only if the current version is `expected_version`
    ///
    /// Fails with `NOT_FOUND` if the key does not exist and with
    /// `VERSION_CONFLICT` if another writer got there first.
    pub fn store_if_version(
        &self,
        space: Option<&MemorySpaceId>,
        entry: ImmutableEntry,
        expected_version: u64,
    ) -> CortexResult<ImmutableRecord> {
        self.store_inner(space, entry, Some(expected_version))
    }

    fn store_inner(
        &self,
        space: Option<&MemorySpaceId>,
        entry: ImmutableEntry,
        expected_version: Option<u64>,
    ) -> CortexResult<ImmutableRecord> {
        self.guard(space)?;
        self.validate_entry(space, &entry)?;

        let scope = Scope::from_option(space);
        let key = ImmutableKey::new(entry.record_type.clone(), entry.id.clone());
        let entity = EntityRef::immutable(&scope, &entry.record_type, &entry.id);

        // Read the clock under the shard lock so version order and time order agree
        let record = self.db.tables.immutable.with_shard_mut(&scope, |shard| {
            let now = self.db.now();
            let next = match shard.get(&key) {
                Some(current) => {
                    if let Some(expected) = expected_version {
                        if current.version() != expected {
                            return Err(CortexError::version_conflict(
                                entity.clone(),
                                expected,
                                current.version(),
                            ));
                        }
                    }
                    let mut next = current.clone();
                    next.commit_version(now, |r| {
                        r.data = entry.data;
                        r.metadata = entry.metadata;
                        if entry.user_id.is_some() {
                            r.user_id = entry.user_id;
                        }
                    });
                    next
                }
                None => {
                    if expected_version.is_some() {
                        return Err(CortexError::not_found(entity.clone()));
                    }
                    ImmutableRecord {
                        record_type: entry.record_type,
                        id: entry.id,
                        memory_space_id: space.cloned(),
                        data: entry.data,
                        user_id: entry.user_id,
                        metadata: entry.metadata,
                        created_at: now,
                        updated_at: now,
                        history: VersionHistory::default(),
                    }
                }
            };
            shard.insert(key.clone(), next.clone())?;
            Ok(next)
        })?;

        tracing::debug!(
            target: "cortex::immutable",
            entity = %entity,
            version = record.version(),
            "record stored"
        );
        Ok(record)
    }

    /// Hard-delete a record and its whole history
    pub fn purge(&self, space: Option<&MemorySpaceId>, record_type: &str, id: &str) -> CortexResult<ImmutableRecord> {
        self.guard(space)?;
        let scope = Scope::from_option(space);
        let key = ImmutableKey::new(record_type, id);
        let removed = self
            .db
            .tables
            .immutable
            .with_shard_mut(&scope, |shard| shard.remove(&key))
            .ok_or_else(|| CortexError::not_found(EntityRef::immutable(&scope, record_type, id)))?;

        tracing::debug!(target: "cortex::immutable", scope = %scope, record_type, id, "record purged");
        Ok(removed)
    }

    /// Hard-delete every record of a scope matching a filter
    ///
    /// `filter.limit` is ignored.
    pub fn purge_many(&self, space: Option<&MemorySpaceId>, filter: &ImmutableFilter) -> CortexResult<usize> {
        self.guard(space)?;
        let scope = Scope::from_option(space);
        let removed = self
            .db
            .tables
            .immutable
            .with_shard_mut(&scope, |shard| shard.remove_where(|_, r| filter.matches(r)))
            .len();
        tracing::debug!(target: "cortex::immutable", scope = %scope, removed, "records purged");
        Ok(removed)
    }

    /// Drop old versions, keeping `keep_latest` including the current one
    pub fn purge_versions(
        &self,
        space: Option<&MemorySpaceId>,
        record_type: &str,
        id: &str,
        keep_latest: usize,
    ) -> CortexResult<PurgeVersionsResult> {
        self.guard(space)?;
        validation::validate_keep_latest(keep_latest)?;
        let scope = Scope::from_option(space);
        let key = ImmutableKey::new(record_type, id);

        self.db
            .tables
            .immutable
            .with_shard_mut(&scope, |shard| {
                shard.update(&key, |r| {
                    r.history.purge(keep_latest).map(|purged| PurgeVersionsResult {
                        versions_purged: purged,
                        versions_remaining: r.history.retained(),
                    })
                })
            })
            .ok_or_else(|| CortexError::not_found(EntityRef::immutable(&scope, record_type, id)))?
    }

    /// Remove every immutable record in every scope
    ///
    /// Only permitted in Dev and Test environments.
    pub fn purge_all(&self) -> CortexResult<usize> {
        self.db.require_destructive("immutable.purge_all")?;
        let removed = self.db.tables.immutable.clear();
        tracing::info!(target: "cortex::immutable", removed, "all records purged");
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current version of a record
    pub fn get(&self, space: Option<&MemorySpaceId>, record_type: &str, id: &str) -> CortexResult<Option<ImmutableRecord>> {
        let scope = Scope::from_option(space);
        Ok(self
            .db
            .tables
            .immutable
            .get(&scope, &ImmutableKey::new(record_type, id)))
    }

    fn require(&self, space: Option<&MemorySpaceId>, record_type: &str, id: &str) -> CortexResult<ImmutableRecord> {
        self.get(space, record_type, id)?.ok_or_else(|| {
            CortexError::not_found(EntityRef::immutable(&Scope::from_option(space), record_type, id))
        })
    }

    /// A specific version of a record
    ///
    /// Fails with `NOT_FOUND` if the record does not exist. Returns None if
    /// the version never existed or was purged.
    pub fn get_version(
        &self,
        space: Option<&MemorySpaceId>,
        record_type: &str,
        id: &str,
        version: u64,
    ) -> CortexResult<Option<ImmutableRecord>> {
        Ok(self.require(space, record_type, id)?.at_version(version))
    }

    /// Every retained version, oldest first
    pub fn get_history(&self, space: Option<&MemorySpaceId>, record_type: &str, id: &str) -> CortexResult<Vec<ImmutableRecord>> {
        Ok(self.require(space, record_type, id)?.all_versions())
    }

    /// The version that was current at time `t`
    pub fn get_at_timestamp(
        &self,
        space: Option<&MemorySpaceId>,
        record_type: &str,
        id: &str,
        t: Millis,
    ) -> CortexResult<Option<ImmutableRecord>> {
        Ok(self.require(space, record_type, id)?.at_timestamp(t))
    }

    /// Records of a scope, most recently updated first
    pub fn list(&self, space: Option<&MemorySpaceId>, filter: &ImmutableFilter) -> CortexResult<Vec<ImmutableRecord>> {
        let scope = Scope::from_option(space);
        let mut records = self.db.tables.immutable.scan(&scope, |_, r| filter.matches(r));
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.key().cmp(&b.key())));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Records whose current data contains `query` (case-insensitive)
    pub fn search(
        &self,
        space: Option<&MemorySpaceId>,
        query: &str,
        filter: &ImmutableFilter,
    ) -> CortexResult<Vec<ImmutableRecord>> {
        if query.trim().is_empty() {
            return Err(CortexError::invalid_input("query must not be empty"));
        }
        let needle = query.to_lowercase();
        let scope = Scope::from_option(space);
        let mut records = self
            .db
            .tables
            .immutable
            .scan(&scope, |_, r| filter.matches(r) && r.data.contains_text(&needle));
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Number of records matching a filter
    pub fn count(&self, space: Option<&MemorySpaceId>, filter: &ImmutableFilter) -> CortexResult<usize> {
        let scope = Scope::from_option(space);
        Ok(self
            .db
            .tables
            .immutable
            .with_shard(&scope, |shard| shard.iter().filter(|(_, r)| filter.matches(r)).count()))
    }
}
