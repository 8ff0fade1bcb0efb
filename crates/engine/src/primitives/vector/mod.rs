//! Searchable vector memories
//!
//! A memory is a piece of text with an optional embedding, an importance
//! score, tags and provenance links to the other layers. Content and
//! embedding are versioned like immutable records.
//!
//! ## Search
//!
//! With a query embedding, memories are ranked by cosine similarity.
//! Otherwise they are ranked by keyword overlap. Either way, role, category
//! and enrichment boosts are applied before `min_score` and `limit`.
//!
//! ## Streaming
//!
//! `store_partial` creates a memory flagged `is_partial`, `update_partial`
//! replaces its content as more arrives, and `finalize_partial` clears the
//! flag. None of these steps creates a version, and partial memories stay
//! out of search results unless asked for.

mod distance;
mod search;
mod streaming;
mod types;

pub use distance::{cosine_similarity, similarity};
pub use types::{
    ContentType, ConversationRef, FactRef, ImmutableRef, MemoryFilter, MemoryRecord, MemorySearch,
    MemorySearchHit, MemorySnapshot, MemorySource, MemoryUpdate, MutableRef, SourceType,
    StoreMemory, DEFAULT_IMPORTANCE, PARTIAL_TAG, STREAMING_TAG,
};

use std::sync::Arc;

use cortex_core::{
    generate_id, CortexError, CortexResult, EntityRef, JsonValue, MemorySpaceId, Millis, Scope,
    Tags,
};
use cortex_storage::StorageError;

use crate::database::Database;
use crate::primitives::owned_elsewhere;
use crate::primitives::versioned::{PurgeVersionsResult, VersionHistory, Versioned};
use crate::search::BoostWeights;
use crate::validation;
use search::{rank, Scorer};

/// Vector memory store
#[derive(Clone)]
pub struct MemoryStore {
    db: Arc<Database>,
}

impl MemoryStore {
    /// Create a new memory store facade
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn not_found(space: &MemorySpaceId, memory_id: &str) -> CortexError {
        CortexError::not_found(EntityRef::memory(space, memory_id))
    }

    /// Error for a write to a memory absent from `space`
    pub(crate) fn missing(space: &MemorySpaceId, memory_id: &str, owner: Option<Scope>) -> CortexError {
        owned_elsewhere("memory", memory_id, space, owner)
            .unwrap_or_else(|| Self::not_found(space, memory_id))
    }

    fn validate_input(&self, space: &MemorySpaceId, input: &StoreMemory, partial: bool) -> CortexResult<()> {
        let limits = self.db.limits();
        validation::validate_space(space, &limits)?;
        if let Some(id) = &input.memory_id {
            validation::validate_id("memory_id", id, &limits)?;
        }
        if partial {
            validation::validate_len("content", &input.content, limits.max_content_bytes)?;
        } else {
            validation::validate_content("content", &input.content, limits.max_content_bytes)?;
        }
        if let Some(embedding) = &input.embedding {
            validation::validate_embedding(embedding, &limits)?;
        }
        if let Some(importance) = input.importance {
            validation::validate_percent("importance", importance)?;
        }
        validation::validate_tags(&input.tags, &limits)?;
        if let Some(enriched) = &input.enriched_content {
            validation::validate_len("enriched_content", enriched, limits.max_content_bytes)?;
        }
        if let Some(metadata) = &input.metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }
        Ok(())
    }

    fn validate_update(&self, update: &MemoryUpdate) -> CortexResult<()> {
        let limits = self.db.limits();
        if let Some(content) = &update.content {
            validation::validate_content("content", content, limits.max_content_bytes)?;
        }
        if let Some(embedding) = &update.embedding {
            validation::validate_embedding(embedding, &limits)?;
        }
        if let Some(importance) = update.importance {
            validation::validate_percent("importance", importance)?;
        }
        if let Some(tags) = &update.tags {
            validation::validate_tags(tags, &limits)?;
        }
        if let Some(enriched) = &update.enriched_content {
            validation::validate_len("enriched_content", enriched, limits.max_content_bytes)?;
        }
        if let Some(metadata) = &update.metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }
        Ok(())
    }

    /// Build and insert a new memory
    ///
    /// `streaming_tags` is Some for partial memories and holds the tags the
    /// streaming protocol added on top of the caller's.
    pub(crate) fn insert_new(
        &self,
        space: &MemorySpaceId,
        input: StoreMemory,
        streaming_tags: Option<Tags>,
        now: Millis,
    ) -> CortexResult<MemoryRecord> {
        let memory_id = input
            .memory_id
            .unwrap_or_else(|| generate_id("mem", now));
        let record = MemoryRecord {
            memory_id: memory_id.clone(),
            memory_space_id: space.clone(),
            participant_id: input.participant_id,
            content: input.content,
            content_type: input.content_type,
            embedding: input.embedding,
            source: MemorySource {
                source_type: input.source_type,
                user_id: input.user_id,
                user_name: input.user_name,
                timestamp: now,
            },
            message_role: input.message_role,
            importance: input.importance.unwrap_or(DEFAULT_IMPORTANCE),
            tags: input.tags,
            enriched_content: input.enriched_content,
            fact_category: input.fact_category,
            conversation_ref: input.conversation_ref,
            immutable_ref: input.immutable_ref,
            mutable_ref: input.mutable_ref,
            fact_ref: input.fact_ref,
            is_partial: streaming_tags.is_some(),
            streaming_tags: streaming_tags.unwrap_or_default(),
            access_count: 0,
            last_accessed: None,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
            history: VersionHistory::default(),
        };

        let entity = EntityRef::memory(space, &memory_id);
        self.db
            .tables
            .memories
            .with_shard_mut(&Scope::from(space), |shard| {
                if shard.contains(&memory_id) {
                    return Err(CortexError::already_exists(entity.clone()));
                }
                match shard.insert(memory_id.clone(), record.clone()) {
                    Ok(_) => Ok(()),
                    Err(StorageError::KeyOwnedElsewhere { .. }) => {
                        Err(CortexError::already_exists(entity.clone()))
                    }
                }
            })?;
        Ok(record)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a memory at version 1
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` on empty content, importance above 100, or
    ///   oversized embeddings, tags or metadata
    /// - `ALREADY_EXISTS` if an explicit `memory_id` is taken
    pub fn store(&self, space: &MemorySpaceId, input: StoreMemory) -> CortexResult<MemoryRecord> {
        self.db.guard_write(space)?;
        self.validate_input(space, &input, false)?;
        let now = self.db.now();
        let record = self.insert_new(space, input, None, now)?;

        tracing::debug!(
            target: "cortex::memory",
            memory_space = %space,
            memory_id = %record.memory_id,
            source = ?record.source.source_type,
            has_embedding = record.embedding.is_some(),
            "memory stored"
        );
        Ok(record)
    }

    /// Apply changes as a new version
    ///
    /// Every update archives the current `{content, embedding}`, even when
    /// only other fields change. Partial memories must go through
    /// `update_partial` / `finalize_partial` instead.
    pub fn update(&self, space: &MemorySpaceId, memory_id: &str, update: MemoryUpdate) -> CortexResult<MemoryRecord> {
        self.update_inner(space, memory_id, update, None)
    }

    /// Like `update`, but only if the current version is `expected_version`
    pub fn update_if_version(
        &self,
        space: &MemorySpaceId,
        memory_id: &str,
        update: MemoryUpdate,
        expected_version: u64,
    ) -> CortexResult<MemoryRecord> {
        self.update_inner(space, memory_id, update, Some(expected_version))
    }

    fn update_inner(
        &self,
        space: &MemorySpaceId,
        memory_id: &str,
        update: MemoryUpdate,
        expected_version: Option<u64>,
    ) -> CortexResult<MemoryRecord> {
        self.db.guard_write(space)?;
        if update.is_empty() {
            return Err(CortexError::invalid_input("update changes nothing"));
        }
        self.validate_update(&update)?;

        let key = memory_id.to_string();
        let record = self
            .db
            .tables
            .memories
            .with_shard_mut(&Scope::from(space), |shard| {
                let now = self.db.now();
                let current = shard
                    .get(&key)
                    .ok_or_else(|| Self::missing(space, memory_id, shard.owner(&key)))?;
                if current.is_partial {
                    return Err(CortexError::invalid_input(format!(
                        "memory {} is still streaming; finalize it first",
                        memory_id
                    )));
                }
                if let Some(expected) = expected_version {
                    if current.version() != expected {
                        return Err(CortexError::version_conflict(
                            EntityRef::memory(space, memory_id),
                            expected,
                            current.version(),
                        ));
                    }
                }
                let mut next = current.clone();
                next.commit_version(now, |m| {
                    if let Some(content) = update.content {
                        m.content = content;
                    }
                    if let Some(embedding) = update.embedding {
                        m.embedding = Some(embedding);
                    }
                    if let Some(importance) = update.importance {
                        m.importance = importance;
                    }
                    if let Some(tags) = update.tags {
                        m.tags = tags;
                    }
                    if let Some(enriched) = update.enriched_content {
                        m.enriched_content = Some(enriched);
                    }
                    if let Some(category) = update.fact_category {
                        m.fact_category = Some(category);
                    }
                    if let Some(metadata) = update.metadata {
                        m.metadata = Some(metadata);
                    }
                });
                shard.insert(key.clone(), next.clone())?;
                Ok(next)
            })?;

        tracing::debug!(
            target: "cortex::memory",
            memory_space = %space,
            memory_id,
            version = record.version(),
            "memory updated"
        );
        Ok(record)
    }

    /// Count a read: bumps `access_count` and sets `last_accessed`
    ///
    /// Neither the version nor `updated_at` changes.
    pub fn record_access(&self, space: &MemorySpaceId, memory_id: &str) -> CortexResult<MemoryRecord> {
        self.db.guard_write(space)?;
        let now = self.db.now();
        let key = memory_id.to_string();
        self.db
            .tables
            .memories
            .with_shard_mut(&Scope::from(space), |shard| {
                shard
                    .update(&key, |m| {
                        m.access_count += 1;
                        m.last_accessed = Some(now);
                        m.clone()
                    })
                    .ok_or_else(|| Self::missing(space, memory_id, shard.owner(&key)))
            })
    }

    /// Hard-delete a memory
    pub fn delete(&self, space: &MemorySpaceId, memory_id: &str) -> CortexResult<MemoryRecord> {
        self.db.guard_write(space)?;
        let key = memory_id.to_string();
        let removed = self
            .db
            .tables
            .memories
            .with_shard_mut(&Scope::from(space), |shard| {
                shard
                    .remove(&key)
                    .ok_or_else(|| Self::missing(space, memory_id, shard.owner(&key)))
            })?;
        tracing::debug!(target: "cortex::memory", memory_space = %space, memory_id, "memory deleted");
        Ok(removed)
    }

    /// Hard-delete every memory of a space matching a filter
    ///
    /// `filter.limit` is ignored.
    pub fn delete_many(&self, space: &MemorySpaceId, filter: &MemoryFilter) -> CortexResult<usize> {
        self.db.guard_write(space)?;
        let removed = self
            .db
            .tables
            .memories
            .with_shard_mut(&Scope::from(space), |shard| shard.remove_where(|_, m| filter.matches(m)))
            .len();
        tracing::debug!(target: "cortex::memory", memory_space = %space, removed, "memories deleted");
        Ok(removed)
    }

    /// Drop old versions, keeping `keep_latest` including the current one
    pub fn purge_versions(&self, space: &MemorySpaceId, memory_id: &str, keep_latest: usize) -> CortexResult<PurgeVersionsResult> {
        self.db.guard_write(space)?;
        validation::validate_keep_latest(keep_latest)?;
        let key = memory_id.to_string();
        self.db
            .tables
            .memories
            .with_shard_mut(&Scope::from(space), |shard| {
                let purged = shard.update(&key, |m| {
                    m.history.purge(keep_latest).map(|purged| PurgeVersionsResult {
                        versions_purged: purged,
                        versions_remaining: m.history.retained(),
                    })
                });
                purged.unwrap_or_else(|| Err(Self::missing(space, memory_id, shard.owner(&key))))
            })
    }

    /// Remove every memory in every space
    ///
    /// Only permitted in Dev and Test environments.
    pub fn purge_all(&self) -> CortexResult<usize> {
        self.db.require_destructive("memories.purge_all")?;
        let removed = self.db.tables.memories.clear();
        tracing::info!(target: "cortex::memory", removed, "all memories purged");
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a memory; None if it does not exist in `space`
    pub fn get(&self, space: &MemorySpaceId, memory_id: &str) -> CortexResult<Option<MemoryRecord>> {
        Ok(self
            .db
            .tables
            .memories
            .get(&Scope::from(space), &memory_id.to_string()))
    }

    fn require(&self, space: &MemorySpaceId, memory_id: &str) -> CortexResult<MemoryRecord> {
        self.get(space, memory_id)?
            .ok_or_else(|| Self::not_found(space, memory_id))
    }

    /// A specific version; None if it never existed or was purged
    pub fn get_version(&self, space: &MemorySpaceId, memory_id: &str, version: u64) -> CortexResult<Option<MemoryRecord>> {
        Ok(self.require(space, memory_id)?.at_version(version))
    }

    /// Every retained version, oldest first
    pub fn get_history(&self, space: &MemorySpaceId, memory_id: &str) -> CortexResult<Vec<MemoryRecord>> {
        Ok(self.require(space, memory_id)?.all_versions())
    }

    /// The version that was current at time `t`
    pub fn get_at_timestamp(&self, space: &MemorySpaceId, memory_id: &str, t: Millis) -> CortexResult<Option<MemoryRecord>> {
        Ok(self.require(space, memory_id)?.at_timestamp(t))
    }

    /// Memories of a space, newest first
    pub fn list(&self, space: &MemorySpaceId, filter: &MemoryFilter) -> CortexResult<Vec<MemoryRecord>> {
        let mut records = self
            .db
            .tables
            .memories
            .scan(&Scope::from(space), |_, m| filter.matches(m));
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.memory_id.cmp(&b.memory_id))
        });
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Number of memories matching a filter
    pub fn count(&self, space: &MemorySpaceId, filter: &MemoryFilter) -> CortexResult<usize> {
        Ok(self
            .db
            .tables
            .memories
            .with_shard(&Scope::from(space), |shard| {
                shard.iter().filter(|(_, m)| filter.matches(m)).count()
            }))
    }

    /// Rank memories of a space against a query
    ///
    /// # Errors
    ///
    /// `VALIDATION_ERROR` if the query embedding is empty or too large, or
    /// `min_score` is not a finite number.
    pub fn search(&self, space: &MemorySpaceId, search: &MemorySearch) -> CortexResult<Vec<MemorySearchHit>> {
        if let Some(embedding) = &search.embedding {
            validation::validate_embedding(embedding, &self.db.limits())?;
        }
        if search.min_score.map_or(false, |m| !m.is_finite()) {
            return Err(CortexError::invalid_input("min_score must be a finite number"));
        }

        let config = self.db.search_config();
        let scorer = Scorer::for_search(search);
        let scored: Vec<(MemoryRecord, f64)> = self
            .db
            .tables
            .memories
            .with_shard(&Scope::from(space), |shard| {
                shard
                    .iter()
                    .filter(|(_, m)| (search.include_partial || !m.is_partial) && search.filter.matches(m))
                    .filter_map(|(_, m)| scorer.score(m).map(|s| (m.clone(), s)))
                    .collect()
            });

        let hits = rank(scored, search, &BoostWeights::from(&config), config.default_limit);
        tracing::debug!(
            target: "cortex::memory",
            memory_space = %space,
            by_embedding = search.embedding.is_some(),
            hits = hits.len(),
            "memory search"
        );
        Ok(hits)
    }
}
