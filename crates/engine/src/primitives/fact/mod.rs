//! Facts and belief revision
//!
//! A fact is a statement, optionally structured as a subject-predicate-object
//! triple, with a confidence and a validity window.
//!
//! Revising a belief does not edit the fact. `update` creates a new fact
//! that supersedes the old one: fields are copied forward, the two are
//! linked, and the old fact's validity window is closed. The chain of
//! superseded facts is the belief's history (see `chain`).
//!
//! `update_in_place` is the exception, for corrections that should not be
//! recorded as a change of belief.

mod chain;
mod types;

pub use types::{
    FactFilter, FactRecord, FactSourceRef, FactSourceType, FactType, FactUpdate, StoreFact,
};

use std::sync::Arc;

use cortex_core::{
    generate_id, CortexError, CortexResult, EntityRef, JsonValue, MemorySpaceId, Millis, Scope,
};
use cortex_storage::StorageError;
use serde::Serialize;

use crate::database::Database;
use crate::primitives::conversation::{csv_field, ExportFormat};
use crate::primitives::owned_elsewhere;
use crate::validation;

const CONSOLIDATED: &str = "consolidated";

/// Fact store
#[derive(Clone)]
pub struct FactStore {
    db: Arc<Database>,
}

impl FactStore {
    /// Create a new fact store facade
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn not_found(space: &MemorySpaceId, fact_id: &str) -> CortexError {
        CortexError::not_found(EntityRef::fact(space, fact_id))
    }

    /// Error for a write to a fact absent from `space`
    fn missing(space: &MemorySpaceId, fact_id: &str, owner: Option<Scope>) -> CortexError {
        owned_elsewhere("fact", fact_id, space, owner).unwrap_or_else(|| Self::not_found(space, fact_id))
    }

    fn validate_text(&self, field: &str, value: &Option<String>) -> CortexResult<()> {
        match value {
            Some(v) => validation::validate_content(field, v, self.db.limits().max_content_bytes),
            None => Ok(()),
        }
    }

    fn validate_update(&self, update: &FactUpdate) -> CortexResult<()> {
        let limits = self.db.limits();
        self.validate_text("fact", &update.fact)?;
        self.validate_text("subject", &update.subject)?;
        self.validate_text("predicate", &update.predicate)?;
        self.validate_text("object", &update.object)?;
        if let Some(confidence) = update.confidence {
            validation::validate_percent("confidence", confidence)?;
        }
        if let Some(tags) = &update.tags {
            validation::validate_tags(tags, &limits)?;
        }
        if let Some(metadata) = &update.metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a new fact at version 1 with no supersession links
    pub fn store(&self, space: &MemorySpaceId, input: StoreFact) -> CortexResult<FactRecord> {
        self.db.guard_write(space)?;
        let limits = self.db.limits();
        validation::validate_space(space, &limits)?;
        if let Some(id) = &input.fact_id {
            validation::validate_id("fact_id", id, &limits)?;
        }
        validation::validate_content("fact", &input.fact, limits.max_content_bytes)?;
        self.validate_text("subject", &input.subject)?;
        self.validate_text("predicate", &input.predicate)?;
        self.validate_text("object", &input.object)?;
        validation::validate_percent("confidence", input.confidence)?;
        validation::validate_tags(&input.tags, &limits)?;
        if let (Some(from), Some(until)) = (input.valid_from, input.valid_until) {
            if until <= from {
                return Err(CortexError::invalid_input("valid_until must be after valid_from"));
            }
        }
        if let Some(metadata) = &input.metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }

        let now = self.db.now();
        let fact_id = input.fact_id.unwrap_or_else(|| generate_id("fact", now));
        let record = FactRecord {
            fact_id: fact_id.clone(),
            memory_space_id: space.clone(),
            participant_id: input.participant_id,
            user_id: input.user_id,
            fact: input.fact,
            fact_type: input.fact_type,
            subject: input.subject,
            predicate: input.predicate,
            object: input.object,
            confidence: input.confidence,
            source_type: input.source_type,
            source_ref: input.source_ref,
            tags: input.tags,
            category: input.category,
            valid_from: Some(input.valid_from.unwrap_or(now)),
            valid_until: input.valid_until,
            version: 1,
            supersedes: None,
            superseded_by: None,
            supersession_reason: None,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        };

        let entity = EntityRef::fact(space, &fact_id);
        self.db
            .tables
            .facts
            .with_shard_mut(&Scope::from(space), |shard| {
                if shard.contains(&fact_id) {
                    return Err(CortexError::already_exists(entity.clone()));
                }
                match shard.insert(fact_id.clone(), record.clone()) {
                    Ok(_) => Ok(()),
                    Err(StorageError::KeyOwnedElsewhere { .. }) => {
                        Err(CortexError::already_exists(entity.clone()))
                    }
                }
            })?;

        tracing::debug!(
            target: "cortex::fact",
            memory_space = %space,
            fact_id = %fact_id,
            fact_type = record.fact_type.as_str(),
            "fact stored"
        );
        Ok(record)
    }

    /// Revise a belief: create a new fact superseding `fact_id`
    ///
    /// The new fact copies every field not named in `update`, gets the next
    /// version, and starts its validity window now. The old fact is linked
    /// forward to it and its validity window ends now.
    ///
    /// # Errors
    ///
    /// - `NOT_FOUND` if the fact does not exist
    /// - `PERMISSION_DENIED` if another memory space owns it
    /// - `STRUCTURAL_ERROR` if the fact is already superseded
    pub fn update(
        &self,
        space: &MemorySpaceId,
        fact_id: &str,
        update: FactUpdate,
        reason: Option<String>,
    ) -> CortexResult<FactRecord> {
        self.db.guard_write(space)?;
        self.validate_update(&update)?;

        let now = self.db.now();
        let new_id = generate_id("fact", now);
        let old_key = fact_id.to_string();
        let record = self
            .db
            .tables
            .facts
            .with_shard_mut(&Scope::from(space), |shard| {
                let old = shard
                    .get(&old_key)
                    .ok_or_else(|| Self::missing(space, fact_id, shard.owner(&old_key)))?;
                if let Some(newer) = &old.superseded_by {
                    return Err(CortexError::structural(format!(
                        "fact {} is already superseded by {}",
                        fact_id, newer
                    )));
                }

                let mut next = old.clone();
                next.apply(update);
                next.fact_id = new_id.clone();
                next.version = old.version + 1;
                next.supersedes = Some(old_key.clone());
                next.superseded_by = None;
                next.supersession_reason = reason;
                next.valid_from = Some(now);
                next.valid_until = None;
                next.created_at = now;
                next.updated_at = now;

                shard.check_insert(&new_id)?;
                shard.update(&old_key, |o| {
                    o.superseded_by = Some(new_id.clone());
                    o.valid_until = Some(now);
                    o.updated_at = now;
                });
                shard.insert(new_id.clone(), next.clone())?;
                Ok(next)
            })?;

        tracing::debug!(
            target: "cortex::fact",
            memory_space = %space,
            old_fact = fact_id,
            new_fact = %record.fact_id,
            version = record.version,
            "fact revised"
        );
        Ok(record)
    }

    /// Correct a fact without recording a new belief
    ///
    /// The version and supersession links are unchanged.
    pub fn update_in_place(&self, space: &MemorySpaceId, fact_id: &str, update: FactUpdate) -> CortexResult<FactRecord> {
        self.db.guard_write(space)?;
        if update.is_empty() {
            return Err(CortexError::invalid_input("update changes nothing"));
        }
        self.validate_update(&update)?;
        let now = self.db.now();
        let key = fact_id.to_string();
        let record = self
            .db
            .tables
            .facts
            .with_shard_mut(&Scope::from(space), |shard| {
                shard
                    .update(&key, |f| {
                        f.apply(update);
                        f.updated_at = now;
                        f.clone()
                    })
                    .ok_or_else(|| Self::missing(space, fact_id, shard.owner(&key)))
            })?;
        tracing::debug!(target: "cortex::fact", memory_space = %space, fact_id, "fact corrected");
        Ok(record)
    }

    /// Link two existing facts: `new_fact_id` supersedes `old_fact_id`
    ///
    /// Both must live in `space`. Re-linking an existing pair is a no-op.
    ///
    /// # Errors
    ///
    /// - `NOT_FOUND` if either fact does not exist
    /// - `PERMISSION_DENIED` if another memory space owns either fact
    /// - `STRUCTURAL_ERROR` if the ids are equal, either side is already
    ///   linked to a different fact, or the link would close a loop
    pub fn supersede(
        &self,
        space: &MemorySpaceId,
        old_fact_id: &str,
        new_fact_id: &str,
        reason: Option<String>,
    ) -> CortexResult<FactRecord> {
        self.db.guard_write(space)?;
        if old_fact_id == new_fact_id {
            return Err(CortexError::structural("a fact cannot supersede itself"));
        }
        let max_len = self.db.facts_config().max_chain_length;
        let now = self.db.now();
        let old_key = old_fact_id.to_string();
        let new_key = new_fact_id.to_string();

        let record = self
            .db
            .tables
            .facts
            .with_shard_mut(&Scope::from(space), |shard| {
                let old = shard
                    .get(&old_key)
                    .ok_or_else(|| Self::missing(space, old_fact_id, shard.owner(&old_key)))?;
                let new = shard
                    .get(&new_key)
                    .ok_or_else(|| Self::missing(space, new_fact_id, shard.owner(&new_key)))?;

                let already_linked = old.superseded_by.as_deref() == Some(new_fact_id)
                    && new.supersedes.as_deref() == Some(old_fact_id);
                if already_linked {
                    return Ok(new.clone());
                }
                if let Some(other) = old.superseded_by.as_deref() {
                    return Err(CortexError::structural(format!(
                        "fact {} is already superseded by {}",
                        old_fact_id, other
                    )));
                }
                if let Some(other) = new.supersedes.as_deref() {
                    return Err(CortexError::structural(format!(
                        "fact {} already supersedes {}",
                        new_fact_id, other
                    )));
                }
                if chain::would_cycle(|id| shard.get(&id.to_string()), old_fact_id, new, max_len) {
                    return Err(CortexError::structural(format!(
                        "linking {} to {} would create a cycle",
                        old_fact_id, new_fact_id
                    )));
                }

                shard.update(&old_key, |o| {
                    o.superseded_by = Some(new_key.clone());
                    if o.valid_until.map_or(true, |until| until > now) {
                        o.valid_until = Some(now);
                    }
                    o.updated_at = now;
                });
                shard
                    .update(&new_key, |n| {
                        n.supersedes = Some(old_key.clone());
                        n.supersession_reason = reason;
                        n.updated_at = now;
                        n.clone()
                    })
                    .ok_or_else(|| Self::not_found(space, new_fact_id))
            })?;

        tracing::debug!(
            target: "cortex::fact",
            memory_space = %space,
            old_fact = old_fact_id,
            new_fact = new_fact_id,
            "fact superseded"
        );
        Ok(record)
    }

    /// Merge duplicate facts into `keep_fact_id`
    ///
    /// Every other fact in the set is marked as superseded by the kept one
    /// and its validity window is closed. The kept fact's confidence becomes
    /// the rounded mean over the whole set. Duplicated ids count once.
    ///
    /// # Errors
    ///
    /// - `STRUCTURAL_ERROR` if `keep_fact_id` is not in the set, is itself
    ///   superseded, or another fact is already superseded elsewhere
    /// - `NOT_FOUND` if any fact does not exist
    /// - `PERMISSION_DENIED` if another memory space owns any of them
    /// - `VALIDATION_ERROR` if the set has fewer than two distinct facts
    pub fn consolidate(
        &self,
        space: &MemorySpaceId,
        fact_ids: &[String],
        keep_fact_id: &str,
    ) -> CortexResult<FactRecord> {
        self.db.guard_write(space)?;
        let mut ids: Vec<String> = Vec::with_capacity(fact_ids.len());
        for id in fact_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        if !ids.iter().any(|id| id == keep_fact_id) {
            return Err(CortexError::structural(format!(
                "fact {} to keep is not among the facts being consolidated",
                keep_fact_id
            )));
        }
        if ids.len() < 2 {
            return Err(CortexError::invalid_input(
                "consolidation needs at least two distinct facts",
            ));
        }

        let now = self.db.now();
        let keep_key = keep_fact_id.to_string();
        let record = self
            .db
            .tables
            .facts
            .with_shard_mut(&Scope::from(space), |shard| {
                let mut confidences = Vec::with_capacity(ids.len());
                for id in &ids {
                    let fact = shard
                        .get(id)
                        .ok_or_else(|| Self::missing(space, id, shard.owner(id)))?;
                    match fact.superseded_by.as_deref() {
                        Some(_) if id == &keep_key => {
                            return Err(CortexError::structural(format!(
                                "fact {} to keep is already superseded",
                                keep_fact_id
                            )));
                        }
                        Some(other) if other != keep_fact_id => {
                            return Err(CortexError::structural(format!(
                                "fact {} is already superseded by {}",
                                id, other
                            )));
                        }
                        _ => {}
                    }
                    confidences.push(fact.confidence);
                }
                let confidence = chain::mean_confidence(confidences)
                    .ok_or_else(|| CortexError::invalid_input("nothing to consolidate"))?;

                for id in ids.iter().filter(|id| *id != &keep_key) {
                    shard.update(id, |f| {
                        f.superseded_by = Some(keep_key.clone());
                        f.supersession_reason = Some(CONSOLIDATED.to_string());
                        if f.valid_until.map_or(true, |until| until > now) {
                            f.valid_until = Some(now);
                        }
                        f.updated_at = now;
                    });
                }
                shard
                    .update(&keep_key, |k| {
                        k.confidence = confidence;
                        k.updated_at = now;
                        k.clone()
                    })
                    .ok_or_else(|| Self::not_found(space, keep_fact_id))
            })?;

        tracing::debug!(
            target: "cortex::fact",
            memory_space = %space,
            kept = keep_fact_id,
            merged = ids.len() - 1,
            confidence = record.confidence,
            "facts consolidated"
        );
        Ok(record)
    }

    /// Soft-delete: close the fact's validity window now
    pub fn delete(&self, space: &MemorySpaceId, fact_id: &str) -> CortexResult<FactRecord> {
        self.db.guard_write(space)?;
        let now = self.db.now();
        let key = fact_id.to_string();
        let record = self
            .db
            .tables
            .facts
            .with_shard_mut(&Scope::from(space), |shard| {
                shard
                    .update(&key, |f| {
                        if f.valid_until.map_or(true, |until| until > now) {
                            f.valid_until = Some(now);
                        }
                        f.updated_at = now;
                        f.clone()
                    })
                    .ok_or_else(|| Self::missing(space, fact_id, shard.owner(&key)))
            })?;
        tracing::debug!(target: "cortex::fact", memory_space = %space, fact_id, "fact invalidated");
        Ok(record)
    }

    /// Remove every fact in every space
    ///
    /// Only permitted in Dev and Test environments.
    pub fn purge_all(&self) -> CortexResult<usize> {
        self.db.require_destructive("facts.purge_all")?;
        let removed = self.db.tables.facts.clear();
        tracing::info!(target: "cortex::fact", removed, "all facts purged");
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a fact; None if it does not exist in `space`
    pub fn get(&self, space: &MemorySpaceId, fact_id: &str) -> CortexResult<Option<FactRecord>> {
        Ok(self.db.tables.facts.get(&Scope::from(space), &fact_id.to_string()))
    }

    /// The whole revision chain through a fact, oldest first
    ///
    /// # Errors
    ///
    /// - `NOT_FOUND` if the fact is not in `space`
    /// - `STRUCTURAL_ERROR` if the chain loops or is too long
    pub fn get_history(&self, space: &MemorySpaceId, fact_id: &str) -> CortexResult<Vec<FactRecord>> {
        let max_len = self.db.facts_config().max_chain_length;
        self.db
            .tables
            .facts
            .with_shard(&Scope::from(space), |shard| {
                let start = shard
                    .get(&fact_id.to_string())
                    .ok_or_else(|| Self::not_found(space, fact_id))?;
                let chain = chain::history(|id| shard.get(&id.to_string()), start, max_len)?;
                Ok(chain.into_iter().cloned().collect())
            })
    }

    /// Facts about a subject
    pub fn query_by_subject(
        &self,
        space: &MemorySpaceId,
        subject: &str,
        include_superseded: bool,
    ) -> CortexResult<Vec<FactRecord>> {
        self.list(
            space,
            &FactFilter {
                subject: Some(subject.to_string()),
                include_superseded,
                include_invalid: include_superseded,
                ..Default::default()
            },
        )
    }

    /// Facts relating a subject through a predicate
    pub fn query_by_relationship(
        &self,
        space: &MemorySpaceId,
        subject: &str,
        predicate: &str,
        include_superseded: bool,
    ) -> CortexResult<Vec<FactRecord>> {
        self.list(
            space,
            &FactFilter {
                subject: Some(subject.to_string()),
                predicate: Some(predicate.to_string()),
                include_superseded,
                include_invalid: include_superseded,
                ..Default::default()
            },
        )
    }

    /// Facts of a space, newest first
    pub fn list(&self, space: &MemorySpaceId, filter: &FactFilter) -> CortexResult<Vec<FactRecord>> {
        let now = self.db.clock().peek();
        let mut records = self
            .db
            .tables
            .facts
            .scan(&Scope::from(space), |_, f| filter.matches(f, now));
        sort_newest_first(&mut records);
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Number of facts matching a filter
    pub fn count(&self, space: &MemorySpaceId, filter: &FactFilter) -> CortexResult<usize> {
        let now = self.db.clock().peek();
        Ok(self
            .db
            .tables
            .facts
            .with_shard(&Scope::from(space), |shard| {
                shard.iter().filter(|(_, f)| filter.matches(f, now)).count()
            }))
    }

    /// Facts whose statement or triple contains `query` (case-insensitive)
    pub fn search(&self, space: &MemorySpaceId, query: &str, filter: &FactFilter) -> CortexResult<Vec<FactRecord>> {
        if query.trim().is_empty() {
            return Err(CortexError::invalid_input("query must not be empty"));
        }
        let needle = query.to_lowercase();
        let now = self.db.clock().peek();
        let mut records = self
            .db
            .tables
            .facts
            .scan(&Scope::from(space), |_, f| filter.matches(f, now) && f.contains_text(&needle));
        sort_newest_first(&mut records);
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Render the facts matching a filter
    pub fn export(&self, space: &MemorySpaceId, filter: &FactFilter, format: ExportFormat) -> CortexResult<String> {
        let records = self.list(space, filter)?;
        match format {
            ExportFormat::Json => to_json(&records),
            ExportFormat::Csv => {
                let mut out = String::from(
                    "fact_id,memory_space_id,fact,fact_type,subject,predicate,object,confidence,version,supersedes,superseded_by,valid_from,valid_until,created_at\n",
                );
                for f in &records {
                    let opt = |v: &Option<String>| csv_field(v.as_deref().unwrap_or_default());
                    let time = |t: Option<Millis>| t.map(|t| t.to_string()).unwrap_or_default();
                    out.push_str(&format!(
                        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
                        csv_field(&f.fact_id),
                        csv_field(f.memory_space_id.as_str()),
                        csv_field(&f.fact),
                        f.fact_type.as_str(),
                        opt(&f.subject),
                        opt(&f.predicate),
                        opt(&f.object),
                        f.confidence,
                        f.version,
                        opt(&f.supersedes),
                        opt(&f.superseded_by),
                        time(f.valid_from),
                        time(f.valid_until),
                        f.created_at,
                    ));
                }
                Ok(out)
            }
        }
    }
}

fn sort_newest_first(records: &mut [FactRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.fact_id.cmp(&b.fact_id))
    });
}

fn to_json<T: Serialize>(value: &T) -> CortexResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CortexError::serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CortexConfig;
    use cortex_core::{Clock, ErrorCode};
    use cortex_security::{Environment, OpenOptions};
    use proptest::prelude::*;

    fn setup() -> (Arc<Database>, FactStore, MemorySpaceId) {
        let db = Database::open_with_clock(
            CortexConfig::default(),
            OpenOptions::new().environment(Environment::Test),
            Clock::manual(1_000),
        )
        .unwrap();
        (db.clone(), FactStore::new(db), MemorySpaceId::from("team-a"))
    }

    fn color(store: &FactStore, space: &MemorySpaceId, id: &str, object: &str, confidence: u8) -> FactRecord {
        store
            .store(
                space,
                StoreFact::new(format!("user likes {}", object), FactType::Preference, confidence)
                    .with_id(id)
                    .triple("user", "likes_color", object),
            )
            .unwrap()
    }

    #[test]
    fn test_store_starts_a_chain() {
        let (_, store, space) = setup();
        let f = color(&store, &space, "f1", "blue", 80);
        assert_eq!(f.version, 1);
        assert!(f.supersedes.is_none() && f.superseded_by.is_none());
        assert!(f.valid_from.is_some());
        assert!(f.valid_until.is_none());

        let err = store
            .store(&space, StoreFact::new("x", FactType::Custom, 101))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        let err = store
            .store(&space, StoreFact::new("dup", FactType::Custom, 1).with_id("f1"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
    }

    #[test]
    fn test_update_creates_new_identity() {
        let (_, store, space) = setup();
        let old = color(&store, &space, "f1", "blue", 80);
        let new = store
            .update(
                &space,
                "f1",
                FactUpdate {
                    fact: Some("user likes green".into()),
                    object: Some("green".into()),
                    ..Default::default()
                },
                Some("changed mind".into()),
            )
            .unwrap();

        assert_ne!(new.fact_id, old.fact_id);
        assert_eq!(new.version, 2);
        assert_eq!(new.confidence, 80);
        assert_eq!(new.subject.as_deref(), Some("user"));
        assert_eq!(new.supersedes.as_deref(), Some("f1"));
        assert_eq!(new.supersession_reason.as_deref(), Some("changed mind"));

        let old = store.get(&space, "f1").unwrap().unwrap();
        assert_eq!(old.superseded_by.as_deref(), Some(new.fact_id.as_str()));
        assert_eq!(old.valid_until, new.valid_from);
        assert_eq!(old.object.as_deref(), Some("blue"));

        let err = store
            .update(&space, "f1", FactUpdate::default(), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StructuralError);
    }

    #[test]
    fn test_queries_exclude_superseded() {
        let (_, store, space) = setup();
        color(&store, &space, "f1", "blue", 80);
        let new = store
            .update(&space, "f1", FactUpdate { object: Some("green".into()), ..Default::default() }, None)
            .unwrap();
        color(&store, &space, "f9", "red", 10);
        store
            .store(&space, StoreFact::new("user is ada", FactType::Identity, 90).triple("user", "name", "ada"))
            .unwrap();

        let current = store.query_by_relationship(&space, "user", "likes_color", false).unwrap();
        let ids: Vec<&str> = current.iter().map(|f| f.fact_id.as_str()).collect();
        assert_eq!(ids, vec!["f9", new.fact_id.as_str()]);

        let all = store.query_by_relationship(&space, "user", "likes_color", true).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(store.query_by_subject(&space, "user", false).unwrap().len(), 3);
    }

    #[test]
    fn test_get_history_walks_both_ways() {
        let (_, store, space) = setup();
        color(&store, &space, "f1", "blue", 80);
        let f2 = store
            .update(&space, "f1", FactUpdate { object: Some("green".into()), ..Default::default() }, None)
            .unwrap();
        let f3 = store
            .update(&space, &f2.fact_id, FactUpdate { object: Some("red".into()), ..Default::default() }, None)
            .unwrap();

        let history = store.get_history(&space, &f2.fact_id).unwrap();
        let objects: Vec<&str> = history.iter().filter_map(|f| f.object.as_deref()).collect();
        assert_eq!(objects, vec!["blue", "green", "red"]);
        assert_eq!(history.iter().filter(|f| f.is_current()).count(), 1);
        assert_eq!(history[2].fact_id, f3.fact_id);

        let err = store.get_history(&MemorySpaceId::from("other"), "f1").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_supersede_links_existing_facts() {
        let (_, store, space) = setup();
        color(&store, &space, "a", "blue", 80);
        color(&store, &space, "b", "green", 80);
        color(&store, &space, "c", "red", 80);

        let b = store.supersede(&space, "a", "b", Some("newer".into())).unwrap();
        assert_eq!(b.supersedes.as_deref(), Some("a"));
        let a = store.get(&space, "a").unwrap().unwrap();
        assert_eq!(a.superseded_by.as_deref(), Some("b"));
        assert!(a.valid_until.is_some());

        // Re-linking is a no-op
        store.supersede(&space, "a", "b", None).unwrap();

        let err = store.supersede(&space, "a", "a", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StructuralError);
        let err = store.supersede(&space, "a", "c", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StructuralError);

        store.supersede(&space, "b", "c", None).unwrap();
        let err = store.supersede(&space, "c", "a", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StructuralError);

        let err = store.supersede(&space, "c", "missing", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_supersede_requires_same_space() {
        let (_, store, space) = setup();
        let other = MemorySpaceId::from("team-b");
        color(&store, &space, "a", "blue", 80);
        color(&store, &other, "b", "green", 80);
        let err = store.supersede(&space, "a", "b", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert!(store.get(&space, "a").unwrap().unwrap().is_current());
        let err = store.supersede(&space, "a", "nowhere", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_writes_from_foreign_space_are_denied() {
        let (_, store, space) = setup();
        let other = MemorySpaceId::from("team-b");
        color(&store, &other, "f1", "blue", 80);
        color(&store, &space, "mine", "red", 60);
        let change = || FactUpdate { object: Some("green".into()), ..Default::default() };

        let errors = vec![
            store.update(&space, "f1", change(), None).unwrap_err(),
            store.update_in_place(&space, "f1", change()).unwrap_err(),
            store.supersede(&space, "f1", "mine", None).unwrap_err(),
            store.consolidate(&space, &["mine".to_string(), "f1".to_string()], "mine").unwrap_err(),
            store.delete(&space, "f1").unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.code(), ErrorCode::PermissionDenied, "{}", err);
        }

        // Reads miss quietly and the owner's fact is untouched
        assert!(store.get(&space, "f1").unwrap().is_none());
        let f1 = store.get(&other, "f1").unwrap().unwrap();
        assert!(f1.is_current());
        assert_eq!(f1.object.as_deref(), Some("blue"));
        assert!(store.get(&space, "mine").unwrap().unwrap().is_current());
    }

    #[test]
    fn test_update_in_place_keeps_identity() {
        let (_, store, space) = setup();
        color(&store, &space, "f1", "blue", 80);
        let fixed = store
            .update_in_place(&space, "f1", FactUpdate { fact: Some("user likes navy".into()), ..Default::default() })
            .unwrap();
        assert_eq!(fixed.fact_id, "f1");
        assert_eq!(fixed.version, 1);
        assert_eq!(fixed.fact, "user likes navy");
        assert_eq!(store.list(&space, &FactFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_consolidate() {
        let (_, store, space) = setup();
        color(&store, &space, "a", "blue", 80);
        color(&store, &space, "b", "blue", 90);
        color(&store, &space, "c", "blue", 71);

        let ids: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "a".into()];
        let kept = store.consolidate(&space, &ids, "b").unwrap();
        assert_eq!(kept.confidence, 80);
        assert!(kept.is_current());
        for id in ["a", "c"] {
            let f = store.get(&space, id).unwrap().unwrap();
            assert_eq!(f.superseded_by.as_deref(), Some("b"));
            assert_eq!(f.supersession_reason.as_deref(), Some(CONSOLIDATED));
            assert!(f.valid_until.is_some());
        }
        assert_eq!(store.count(&space, &FactFilter::default()).unwrap(), 1);
    }

    #[test]
    fn test_consolidate_errors() {
        let (_, store, space) = setup();
        color(&store, &space, "a", "blue", 80);
        color(&store, &space, "b", "blue", 90);

        let err = store
            .consolidate(&space, &["a".to_string(), "b".to_string()], "z")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StructuralError);
        let err = store.consolidate(&space, &["a".to_string()], "a").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        let err = store
            .consolidate(&space, &["a".to_string(), "missing".to_string()], "a")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(store.get(&space, "a").unwrap().unwrap().is_current());
    }

    #[test]
    fn test_delete_is_soft() {
        let (_, store, space) = setup();
        color(&store, &space, "f1", "blue", 80);
        store.delete(&space, "f1").unwrap();
        assert!(store.get(&space, "f1").unwrap().is_some());
        assert_eq!(store.count(&space, &FactFilter::default()).unwrap(), 0);
        let with_invalid = FactFilter { include_invalid: true, ..Default::default() };
        assert_eq!(store.count(&space, &with_invalid).unwrap(), 1);
        assert_eq!(store.delete(&space, "nope").unwrap_err().code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_search_and_filters() {
        let (_, store, space) = setup();
        color(&store, &space, "f1", "Blue", 80);
        store
            .store(&space, StoreFact::new("works at acme", FactType::Knowledge, 40).tag("work"))
            .unwrap();

        assert_eq!(store.search(&space, "blue", &FactFilter::default()).unwrap().len(), 1);
        assert_eq!(store.search(&space, "LIKES_COLOR", &FactFilter::default()).unwrap().len(), 1);
        assert!(store.search(&space, " ", &FactFilter::default()).is_err());

        let confident = FactFilter { min_confidence: Some(50), ..Default::default() };
        assert_eq!(store.list(&space, &confident).unwrap().len(), 1);
        let mut tags = cortex_core::Tags::new();
        tags.insert("work".into());
        let work = FactFilter { tags, ..Default::default() };
        assert_eq!(store.list(&space, &work).unwrap()[0].fact, "works at acme");
        let knowledge = FactFilter { fact_type: Some(FactType::Knowledge), ..Default::default() };
        assert_eq!(store.count(&space, &knowledge).unwrap(), 1);
    }

    #[test]
    fn test_export() {
        let (_, store, space) = setup();
        store
            .store(&space, StoreFact::new("likes tea, not coffee", FactType::Preference, 70).with_id("f1"))
            .unwrap();
        let json = store.export(&space, &FactFilter::default(), ExportFormat::Json).unwrap();
        let parsed: Vec<FactRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].fact_id, "f1");

        let csv = store.export(&space, &FactFilter::default(), ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("f1,team-a,\"likes tea, not coffee\",preference,"));
    }

    proptest! {
        #[test]
        fn prop_update_chain_has_one_current_belief(n in 1usize..10) {
            let (_, store, space) = setup();
            let mut current = color(&store, &space, "f0", "c0", 50);
            for i in 0..n {
                current = store
                    .update(&space, &current.fact_id, FactUpdate { object: Some(format!("c{}", i + 1)), ..Default::default() }, None)
                    .unwrap();
            }
            let history = store.get_history(&space, "f0").unwrap();
            prop_assert_eq!(history.len(), n + 1);
            prop_assert_eq!(history.iter().filter(|f| f.is_current()).count(), 1);
            let versions: Vec<u64> = history.iter().map(|f| f.version).collect();
            let expected: Vec<u64> = (1..=n as u64 + 1).collect();
            prop_assert_eq!(versions, expected);
        }
    }
}
