//! Memory space registry
//!
//! A memory space is the isolation unit every other layer scopes records
//! by. Registration is optional for writing into a space, but only a
//! registered space can be archived, which makes every layer reject writes
//! into it, or deleted with a cascade across all layers.

mod cascade;
mod types;

pub use types::{
    CascadeReport, MemorySpace, MemorySpaceFilter, MemorySpaceStats, MemorySpaceUpdate,
    NewParticipant, Participant, RegisterMemorySpace, SpaceStatus, SpaceType,
};

use std::sync::Arc;

use cortex_core::{CortexError, CortexResult, EntityRef, JsonValue, MemorySpaceId, Scope};

use crate::database::Database;
use crate::validation;

/// Memory space registry
#[derive(Clone)]
pub struct MemorySpaceRegistry {
    db: Arc<Database>,
}

fn not_found(space: &MemorySpaceId) -> CortexError {
    CortexError::not_found(EntityRef::memory_space(space))
}

impl MemorySpaceRegistry {
    /// Create a new registry facade
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn require(&self, space: &MemorySpaceId) -> CortexResult<MemorySpace> {
        self.db
            .tables
            .spaces
            .get(&Scope::Global, space)
            .ok_or_else(|| not_found(space))
    }

    /// Read-modify-write a registry record
    ///
    /// With `writable_only`, archived spaces are refused.
    fn modify(
        &self,
        space: &MemorySpaceId,
        writable_only: bool,
        f: impl FnOnce(&mut MemorySpace) -> CortexResult<()>,
    ) -> CortexResult<MemorySpace> {
        self.db.require_writable()?;
        self.db.tables.spaces.with_shard_mut(&Scope::Global, |shard| {
            let mut next = shard.get(space).cloned().ok_or_else(|| not_found(space))?;
            if writable_only && next.is_archived() {
                return Err(CortexError::permission_denied(format!(
                    "memory space {} is archived",
                    space
                )));
            }
            f(&mut next)?;
            shard.insert(space.clone(), next.clone())?;
            Ok(next)
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Register a memory space
    ///
    /// # Errors
    ///
    /// `ALREADY_EXISTS` if the space is already registered.
    pub fn register(&self, input: RegisterMemorySpace) -> CortexResult<MemorySpace> {
        self.db.require_writable()?;
        let limits = self.db.limits();
        let space = input.memory_space_id;
        validation::validate_space(&space, &limits)?;
        if let Some(name) = &input.name {
            validation::validate_content("name", name, limits.max_id_bytes)?;
        }
        for participant in &input.participants {
            validation::validate_id("participant_id", &participant.id, &limits)?;
            validation::validate_id("participant_type", &participant.participant_type, &limits)?;
        }
        if let Some(metadata) = &input.metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }

        let now = self.db.now();
        let mut participants: Vec<Participant> = Vec::with_capacity(input.participants.len());
        for p in input.participants {
            if !participants.iter().any(|existing| existing.id == p.id) {
                participants.push(Participant {
                    id: p.id,
                    participant_type: p.participant_type,
                    joined_at: now,
                });
            }
        }
        let record = MemorySpace {
            memory_space_id: space.clone(),
            name: input.name,
            space_type: input.space_type,
            participants,
            status: SpaceStatus::Active,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
            archived_at: None,
        };

        self.db.tables.spaces.with_shard_mut(&Scope::Global, |shard| {
            if shard.contains(&space) {
                return Err(CortexError::already_exists(EntityRef::memory_space(&space)));
            }
            shard.insert(space.clone(), record.clone())?;
            Ok(())
        })?;

        tracing::info!(
            target: "cortex::space",
            memory_space = %space,
            space_type = ?record.space_type,
            participants = record.participants.len(),
            "memory space registered"
        );
        Ok(record)
    }

    /// Rename a space or replace its metadata
    ///
    /// # Errors
    ///
    /// `PERMISSION_DENIED` if the space is archived.
    pub fn update(&self, space: &MemorySpaceId, update: MemorySpaceUpdate) -> CortexResult<MemorySpace> {
        if update.is_empty() {
            return Err(CortexError::invalid_input("update changes nothing"));
        }
        let limits = self.db.limits();
        if let Some(name) = &update.name {
            validation::validate_content("name", name, limits.max_id_bytes)?;
        }
        if let Some(metadata) = &update.metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }

        let now = self.db.now();
        let record = self.modify(space, true, |s| {
            if let Some(name) = update.name {
                s.name = Some(name);
            }
            if let Some(metadata) = update.metadata {
                s.metadata = Some(metadata);
            }
            s.updated_at = now;
            Ok(())
        })?;
        tracing::debug!(target: "cortex::space", memory_space = %space, "memory space updated");
        Ok(record)
    }

    /// Add a participant; adding an existing participant is a no-op
    pub fn add_participant(&self, space: &MemorySpaceId, participant: NewParticipant) -> CortexResult<MemorySpace> {
        let limits = self.db.limits();
        validation::validate_id("participant_id", &participant.id, &limits)?;
        validation::validate_id("participant_type", &participant.participant_type, &limits)?;

        let now = self.db.now();
        let participant_id = participant.id.clone();
        let record = self.modify(space, true, |s| {
            if s.participant(&participant.id).is_none() {
                s.participants.push(Participant {
                    id: participant.id,
                    participant_type: participant.participant_type,
                    joined_at: now,
                });
                s.updated_at = now;
            }
            Ok(())
        })?;
        tracing::debug!(
            target: "cortex::space",
            memory_space = %space,
            participant_id = %participant_id,
            "participant added"
        );
        Ok(record)
    }

    /// Remove a participant
    ///
    /// # Errors
    ///
    /// `NOT_FOUND` if the participant is not a member.
    pub fn remove_participant(&self, space: &MemorySpaceId, participant_id: &str) -> CortexResult<MemorySpace> {
        let now = self.db.now();
        let record = self.modify(space, true, |s| {
            let before = s.participants.len();
            s.participants.retain(|p| p.id != participant_id);
            if s.participants.len() == before {
                return Err(CortexError::not_found(EntityRef::participant(space, participant_id)));
            }
            s.updated_at = now;
            Ok(())
        })?;
        tracing::debug!(target: "cortex::space", memory_space = %space, participant_id, "participant removed");
        Ok(record)
    }

    /// Archive a space; every layer then rejects writes into it
    pub fn archive(&self, space: &MemorySpaceId) -> CortexResult<MemorySpace> {
        self.set_status(space, SpaceStatus::Archived)
    }

    /// Make an archived space writable again
    pub fn reactivate(&self, space: &MemorySpaceId) -> CortexResult<MemorySpace> {
        self.set_status(space, SpaceStatus::Active)
    }

    fn set_status(&self, space: &MemorySpaceId, status: SpaceStatus) -> CortexResult<MemorySpace> {
        let now = self.db.now();
        let record = self.modify(space, false, |s| {
            if s.status != status {
                s.status = status;
                s.archived_at = (status == SpaceStatus::Archived).then_some(now);
                s.updated_at = now;
            }
            Ok(())
        })?;
        tracing::info!(target: "cortex::space", memory_space = %space, status = ?status, "memory space status set");
        Ok(record)
    }

    /// Unregister a space
    ///
    /// With `cascade`, every layer's records in the space are dropped first,
    /// layer by layer, and the report says what went. Without it the space
    /// must hold no records.
    ///
    /// # Errors
    ///
    /// - `NOT_FOUND` if the space is not registered
    /// - `STRUCTURAL_ERROR` if records remain and `cascade` is false
    pub fn delete(&self, space: &MemorySpaceId, cascade: bool) -> CortexResult<CascadeReport> {
        self.db.require_writable()?;
        let registered = self.require(space)?;

        let report = if cascade {
            cascade::purge_space(&self.db, space)
        } else {
            let remaining = cascade::counts(&self.db, space, registered.participants.len()).total_records();
            if remaining > 0 {
                return Err(CortexError::structural(format!(
                    "memory space {} still holds {} records; delete with cascade",
                    space, remaining
                )));
            }
            cascade::purge_space(&self.db, space)
        };

        self.db
            .tables
            .spaces
            .with_shard_mut(&Scope::Global, |shard| shard.remove(space))
            .ok_or_else(|| not_found(space))?;

        tracing::info!(
            target: "cortex::space",
            memory_space = %space,
            cascade,
            deleted = report.total_deleted(),
            orphaned_contexts = report.orphaned_contexts.len(),
            "memory space deleted"
        );
        Ok(report)
    }

    /// Remove every registry record
    ///
    /// Only permitted in Dev and Test environments. Layer data is untouched.
    pub fn purge_all(&self) -> CortexResult<usize> {
        self.db.require_destructive("memory_spaces.purge_all")?;
        let removed = self.db.tables.spaces.clear();
        tracing::info!(target: "cortex::space", removed, "all memory spaces purged");
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a registered space
    pub fn get(&self, space: &MemorySpaceId) -> CortexResult<Option<MemorySpace>> {
        Ok(self.db.tables.spaces.get(&Scope::Global, space))
    }

    /// Registered spaces, oldest first
    pub fn list(&self, filter: &MemorySpaceFilter) -> CortexResult<Vec<MemorySpace>> {
        let mut spaces = self
            .db
            .tables
            .spaces
            .scan(&Scope::Global, |_, s| filter.matches(s));
        spaces.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.memory_space_id.cmp(&b.memory_space_id))
        });
        if let Some(limit) = filter.limit {
            spaces.truncate(limit);
        }
        Ok(spaces)
    }

    /// Number of registered spaces matching a filter
    pub fn count(&self, filter: &MemorySpaceFilter) -> CortexResult<usize> {
        Ok(self
            .db
            .tables
            .spaces
            .with_shard(&Scope::Global, |shard| {
                shard.iter().filter(|(_, s)| filter.matches(s)).count()
            }))
    }

    /// Record counts across every layer of a registered space
    pub fn stats(&self, space: &MemorySpaceId) -> CortexResult<MemorySpaceStats> {
        let registered = self.require(space)?;
        Ok(cascade::counts(&self.db, space, registered.participants.len()))
    }
}
