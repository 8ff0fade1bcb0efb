//! Workflow context tree
//!
//! Contexts form a strict tree: every context has at most one parent, a
//! `depth` one more than its parent's and the `root_id` of its tree. Context
//! ids are unique across memory spaces, so a context is addressed by id
//! alone.
//!
//! `{status, data, description}` is versioned like an immutable record.
//! Structural fields (`child_ids`, `participants`, `granted_access`) change
//! without creating a version.
//!
//! A child normally lives in its parent's space. A child in another space
//! needs an access grant on the parent; that create touches two shards and
//! removes the child again if the parent disappears in between.

mod tree;
mod types;

pub use types::{
    ContextChain, ContextDeleteReport, ContextFilter, ContextRecord, ContextSnapshot,
    ContextStatus, ContextUpdate, CreateContext, GrantedAccess,
};

use std::sync::Arc;

use cortex_core::{
    generate_id, CortexError, CortexResult, EntityRef, JsonValue, MemorySpaceId, Millis, Scope,
};
use cortex_storage::{ShardMut, StorageError};

use crate::database::Database;
use crate::primitives::versioned::{VersionHistory, Versioned};
use crate::validation;

/// Context tree store
#[derive(Clone)]
pub struct ContextStore {
    db: Arc<Database>,
}

fn not_found(context_id: &str) -> CortexError {
    CortexError::not_found(EntityRef::context(context_id))
}

/// Insert a new context into the shard it belongs to
fn insert_new(shard: &mut ShardMut<'_, String, ContextRecord>, record: &ContextRecord) -> CortexResult<()> {
    let id = &record.context_id;
    if shard.contains(id) {
        return Err(CortexError::already_exists(EntityRef::context(id.as_str())));
    }
    match shard.insert(id.clone(), record.clone()) {
        Ok(_) => Ok(()),
        Err(StorageError::KeyOwnedElsewhere { .. }) => {
            Err(CortexError::already_exists(EntityRef::context(id.as_str())))
        }
    }
}

impl ContextStore {
    /// Create a new context store facade
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn lookup(&self, context_id: &str) -> Option<ContextRecord> {
        self.db
            .tables
            .contexts
            .find(&context_id.to_string())
            .map(|(_, record)| record)
    }

    fn require(&self, context_id: &str) -> CortexResult<ContextRecord> {
        self.lookup(context_id).ok_or_else(|| not_found(context_id))
    }

    fn validate_create(&self, input: &CreateContext) -> CortexResult<()> {
        let limits = self.db.limits();
        validation::validate_space(&input.memory_space_id, &limits)?;
        if let Some(id) = &input.context_id {
            validation::validate_id("context_id", id, &limits)?;
        }
        if let Some(parent_id) = &input.parent_id {
            validation::validate_id("parent_id", parent_id, &limits)?;
        }
        validation::validate_content("purpose", &input.purpose, limits.max_content_bytes)?;
        if let Some(description) = &input.description {
            validation::validate_len("description", description, limits.max_content_bytes)?;
        }
        for participant in &input.participants {
            validation::validate_id("participant_id", participant, &limits)?;
        }
        if let Some(data) = &input.data {
            validation::validate_payload("data", data, &limits)?;
        }
        if let Some(metadata) = &input.metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }
        Ok(())
    }

    /// Read-modify-write a context in its own shard
    fn modify<T>(
        &self,
        context_id: &str,
        f: impl FnOnce(&mut ContextRecord) -> CortexResult<T>,
    ) -> CortexResult<(ContextRecord, T)> {
        let (scope, current) = self
            .db
            .tables
            .contexts
            .find(&context_id.to_string())
            .ok_or_else(|| not_found(context_id))?;
        self.db.guard_write(&current.memory_space_id)?;

        let key = context_id.to_string();
        self.db.tables.contexts.with_shard_mut(&scope, |shard| {
            let mut next = shard.get(&key).cloned().ok_or_else(|| not_found(context_id))?;
            let out = f(&mut next)?;
            shard.insert(key.clone(), next.clone())?;
            Ok((next, out))
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a root or child context
    ///
    /// A child gets `depth = parent.depth + 1`, inherits the parent's
    /// `root_id` and is appended to the parent's `child_ids`.
    ///
    /// # Errors
    ///
    /// - `NOT_FOUND` if the parent does not exist
    /// - `PERMISSION_DENIED` if the parent lives in another space that was
    ///   not granted access
    /// - `ALREADY_EXISTS` if an explicit `context_id` is taken in any space
    pub fn create(&self, input: CreateContext) -> CortexResult<ContextRecord> {
        let space = input.memory_space_id.clone();
        self.db.guard_write(&space)?;
        self.validate_create(&input)?;

        let parent = match &input.parent_id {
            Some(parent_id) => Some(self.require(parent_id)?),
            None => None,
        };
        if let Some(parent) = &parent {
            if !parent.grants(&space) {
                return Err(CortexError::permission_denied(format!(
                    "memory space {} has no access to context {}",
                    space, parent.context_id
                )));
            }
        }

        let now = self.db.now();
        let context_id = input
            .context_id
            .unwrap_or_else(|| generate_id("ctx", now));
        let record = ContextRecord {
            context_id: context_id.clone(),
            memory_space_id: space.clone(),
            purpose: input.purpose,
            description: input.description,
            user_id: input.user_id,
            parent_id: input.parent_id,
            root_id: parent
                .as_ref()
                .map_or_else(|| context_id.clone(), |p| p.root_id.clone()),
            depth: parent.as_ref().map_or(0, |p| p.depth + 1),
            child_ids: Vec::new(),
            status: input.status,
            participants: input.participants,
            granted_access: Vec::new(),
            data: input.data,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
            completed_at: (input.status == ContextStatus::Completed).then_some(now),
            history: VersionHistory::default(),
        };

        let scope = Scope::from(&space);
        match parent {
            None => {
                self.db
                    .tables
                    .contexts
                    .with_shard_mut(&scope, |shard| insert_new(shard, &record))?;
            }
            Some(parent) if parent.memory_space_id == space => {
                let parent_id = parent.context_id;
                self.db.tables.contexts.with_shard_mut(&scope, |shard| {
                    if !shard.contains(&parent_id) {
                        return Err(not_found(&parent_id));
                    }
                    insert_new(shard, &record)?;
                    shard.update(&parent_id, |p| p.child_ids.push(context_id.clone()));
                    Ok(())
                })?;
            }
            Some(parent) => self.attach_across_spaces(&record, &parent)?,
        }

        tracing::debug!(
            target: "cortex::context",
            memory_space = %space,
            context_id = %record.context_id,
            depth = record.depth,
            root_id = %record.root_id,
            "context created"
        );
        Ok(record)
    }

    fn attach_across_spaces(&self, record: &ContextRecord, parent: &ContextRecord) -> CortexResult<()> {
        self.db.guard_write(&parent.memory_space_id)?;
        let child_scope = Scope::from(&record.memory_space_id);
        let parent_scope = Scope::from(&parent.memory_space_id);

        self.db
            .tables
            .contexts
            .with_shard_mut(&child_scope, |shard| insert_new(shard, record))?;

        let attached = self
            .db
            .tables
            .contexts
            .with_shard_mut(&parent_scope, |shard| {
                shard.update(&parent.context_id, |p| p.child_ids.push(record.context_id.clone()))
            });
        if attached.is_none() {
            self.db
                .tables
                .contexts
                .with_shard_mut(&child_scope, |shard| shard.remove(&record.context_id));
            return Err(not_found(&parent.context_id));
        }
        Ok(())
    }

    /// Apply changes as a new version
    pub fn update(&self, context_id: &str, update: ContextUpdate) -> CortexResult<ContextRecord> {
        self.update_inner(context_id, update, None)
    }

    /// Like `update`, but only if the current version is `expected_version`
    pub fn update_if_version(
        &self,
        context_id: &str,
        update: ContextUpdate,
        expected_version: u64,
    ) -> CortexResult<ContextRecord> {
        self.update_inner(context_id, update, Some(expected_version))
    }

    fn update_inner(
        &self,
        context_id: &str,
        update: ContextUpdate,
        expected_version: Option<u64>,
    ) -> CortexResult<ContextRecord> {
        if update.is_empty() {
            return Err(CortexError::invalid_input("update changes nothing"));
        }
        let limits = self.db.limits();
        if let Some(description) = &update.description {
            validation::validate_len("description", description, limits.max_content_bytes)?;
        }
        if let Some(data) = &update.data {
            validation::validate_payload("data", data, &limits)?;
        }

        let (record, _) = self.modify(context_id, |c| {
            let now = self.db.now();
            if let Some(expected) = expected_version {
                if c.version() != expected {
                    return Err(CortexError::version_conflict(
                        EntityRef::context(context_id),
                        expected,
                        c.version(),
                    ));
                }
            }
            let was_completed = c.status == ContextStatus::Completed;
            c.commit_version(now, |c| {
                if let Some(status) = update.status {
                    c.status = status;
                }
                if let Some(data) = update.data {
                    c.data = Some(data);
                }
                if let Some(description) = update.description {
                    c.description = Some(description);
                }
            });
            if c.status == ContextStatus::Completed && !was_completed {
                c.completed_at = Some(now);
            }
            Ok(())
        })?;

        tracing::debug!(
            target: "cortex::context",
            memory_space = %record.memory_space_id,
            context_id,
            version = record.version(),
            status = ?record.status,
            "context updated"
        );
        Ok(record)
    }

    /// Delete a context, and with `cascade` everything below it
    ///
    /// Descendants are removed deepest first. A descendant that cannot be
    /// removed (for example because its space is archived) is skipped and
    /// reported as orphaned. The context is then detached from its parent.
    ///
    /// # Errors
    ///
    /// `STRUCTURAL_ERROR` if the context has children and `cascade` is false.
    pub fn delete(&self, context_id: &str, cascade: bool) -> CortexResult<ContextDeleteReport> {
        let target = self.require(context_id)?;
        self.db.guard_write(&target.memory_space_id)?;

        let below = tree::descendants(|id| self.lookup(id), &target);
        if !below.is_empty() && !cascade {
            return Err(CortexError::structural(format!(
                "context {} has {} descendants; delete with cascade",
                context_id,
                below.len()
            )));
        }

        let mut report = ContextDeleteReport {
            deleted: Vec::with_capacity(below.len() + 1),
            orphaned: Vec::new(),
        };
        for ctx in below.iter().rev() {
            match self.remove_one(ctx) {
                Ok(()) => report.deleted.push(ctx.context_id.clone()),
                Err(e) => {
                    tracing::warn!(
                        target: "cortex::context",
                        context_id = %ctx.context_id,
                        root_id = %context_id,
                        error = %e,
                        "cascade could not delete context"
                    );
                    report.orphaned.push(ctx.context_id.clone());
                }
            }
        }
        self.remove_one(&target)?;
        report.deleted.push(target.context_id.clone());

        if let Some(parent_id) = &target.parent_id {
            let detached = self
                .db
                .tables
                .contexts
                .locate(parent_id)
                .and_then(|scope| {
                    self.db.tables.contexts.with_shard_mut(&scope, |shard| {
                        shard.update(parent_id, |p| p.child_ids.retain(|c| c != context_id))
                    })
                });
            if detached.is_none() {
                tracing::warn!(
                    target: "cortex::context",
                    context_id,
                    parent_id = %parent_id,
                    "parent missing while detaching deleted context"
                );
            }
        }

        tracing::debug!(
            target: "cortex::context",
            memory_space = %target.memory_space_id,
            context_id,
            deleted = report.deleted.len(),
            orphaned = report.orphaned.len(),
            "context deleted"
        );
        Ok(report)
    }

    fn remove_one(&self, ctx: &ContextRecord) -> CortexResult<()> {
        self.db.guard_write(&ctx.memory_space_id)?;
        self.db
            .tables
            .contexts
            .with_shard_mut(&Scope::from(&ctx.memory_space_id), |shard| {
                shard.remove(&ctx.context_id)
            })
            .map(|_| ())
            .ok_or_else(|| not_found(&ctx.context_id))
    }

    /// Add a participant; adding one twice is a no-op
    pub fn add_participant(&self, context_id: &str, participant_id: &str) -> CortexResult<ContextRecord> {
        validation::validate_id("participant_id", participant_id, &self.db.limits())?;
        let (record, _) = self.modify(context_id, |c| {
            if !c.participants.iter().any(|p| p == participant_id) {
                c.participants.push(participant_id.to_string());
            }
            Ok(())
        })?;
        tracing::debug!(target: "cortex::context", context_id, participant_id, "participant added");
        Ok(record)
    }

    /// Let another memory space attach children to this context
    ///
    /// Granting the same space again replaces its scope.
    pub fn grant_access(
        &self,
        context_id: &str,
        space: &MemorySpaceId,
        scope: impl Into<String>,
    ) -> CortexResult<ContextRecord> {
        let limits = self.db.limits();
        validation::validate_space(space, &limits)?;
        let scope = scope.into();
        validation::validate_id("scope", &scope, &limits)?;

        let now = self.db.now();
        let (record, _) = self.modify(context_id, |c| {
            if &c.memory_space_id == space {
                return Err(CortexError::invalid_input(format!(
                    "context {} already belongs to memory space {}",
                    context_id, space
                )));
            }
            c.granted_access.retain(|g| &g.memory_space_id != space);
            c.granted_access.push(GrantedAccess {
                memory_space_id: space.clone(),
                scope,
                granted_at: now,
            });
            Ok(())
        })?;
        tracing::debug!(
            target: "cortex::context",
            context_id,
            granted_to = %space,
            "context access granted"
        );
        Ok(record)
    }

    /// Remove every context in every space
    ///
    /// Only permitted in Dev and Test environments.
    pub fn purge_all(&self) -> CortexResult<usize> {
        self.db.require_destructive("contexts.purge_all")?;
        let removed = self.db.tables.contexts.clear();
        tracing::info!(target: "cortex::context", removed, "all contexts purged");
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a context by id
    pub fn get(&self, context_id: &str) -> CortexResult<Option<ContextRecord>> {
        Ok(self.lookup(context_id))
    }

    /// A context with its ancestors, siblings and children
    ///
    /// # Errors
    ///
    /// `STRUCTURAL_ERROR` if an ancestor is missing or parent links loop.
    pub fn get_chain(&self, context_id: &str) -> CortexResult<ContextChain> {
        let current = self.require(context_id)?;
        let ancestors = tree::ancestors(|id| self.lookup(id), &current)?;
        let root = ancestors.first().cloned().unwrap_or_else(|| current.clone());
        let parent = ancestors.last().cloned();
        let siblings = match &parent {
            Some(p) => {
                let others: Vec<String> = p
                    .child_ids
                    .iter()
                    .filter(|id| *id != context_id)
                    .cloned()
                    .collect();
                tree::resolve(|id| self.lookup(id), &others)
            }
            None => Vec::new(),
        };
        let children = tree::resolve(|id| self.lookup(id), &current.child_ids);

        Ok(ContextChain {
            depth: current.depth,
            current,
            root,
            ancestors,
            parent,
            siblings,
            children,
        })
    }

    /// Root of the tree containing a context
    pub fn get_root(&self, context_id: &str) -> CortexResult<ContextRecord> {
        let current = self.require(context_id)?;
        let ancestors = tree::ancestors(|id| self.lookup(id), &current)?;
        Ok(ancestors.into_iter().next().unwrap_or(current))
    }

    /// Direct children, or with `recursive` every descendant breadth first
    pub fn get_children(&self, context_id: &str, recursive: bool) -> CortexResult<Vec<ContextRecord>> {
        let current = self.require(context_id)?;
        Ok(if recursive {
            tree::descendants(|id| self.lookup(id), &current)
        } else {
            tree::resolve(|id| self.lookup(id), &current.child_ids)
        })
    }

    /// Contexts matching a filter, newest first
    pub fn list(&self, filter: &ContextFilter) -> CortexResult<Vec<ContextRecord>> {
        let mut records = match &filter.memory_space_id {
            Some(space) => self
                .db
                .tables
                .contexts
                .scan(&Scope::from(space), |_, c| filter.matches(c)),
            None => self
                .db
                .tables
                .contexts
                .scan_all(|_, c| filter.matches(c))
                .into_iter()
                .map(|(_, c)| c)
                .collect(),
        };
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.context_id.cmp(&b.context_id))
        });
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Number of contexts matching a filter
    pub fn count(&self, filter: &ContextFilter) -> CortexResult<usize> {
        let unlimited = ContextFilter {
            limit: None,
            ..filter.clone()
        };
        Ok(self.list(&unlimited)?.len())
    }

    /// A specific version; None if it never existed or was purged
    pub fn get_version(&self, context_id: &str, version: u64) -> CortexResult<Option<ContextRecord>> {
        Ok(self.require(context_id)?.at_version(version))
    }

    /// Every retained version, oldest first
    pub fn get_history(&self, context_id: &str) -> CortexResult<Vec<ContextRecord>> {
        Ok(self.require(context_id)?.all_versions())
    }

    /// The version that was current at time `t`
    pub fn get_at_timestamp(&self, context_id: &str, t: Millis) -> CortexResult<Option<ContextRecord>> {
        Ok(self.require(context_id)?.at_timestamp(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CortexConfig;
    use crate::primitives::space::{MemorySpaceRegistry, RegisterMemorySpace, SpaceType};
    use cortex_core::{Clock, ErrorCode};
    use cortex_security::{Environment, OpenOptions};

    fn setup() -> (Arc<Database>, ContextStore, MemorySpaceId) {
        let db = Database::open_with_clock(
            CortexConfig::default(),
            OpenOptions::new().environment(Environment::Test),
            Clock::manual(1_000),
        )
        .unwrap();
        (db.clone(), ContextStore::new(db), MemorySpaceId::from("team-a"))
    }

    fn child(store: &ContextStore, space: &MemorySpaceId, parent: &str, id: &str) -> ContextRecord {
        store
            .create(CreateContext::new(space.clone(), id).with_id(id).child_of(parent))
            .unwrap()
    }

    #[test]
    fn test_create_tree() {
        let (_, store, space) = setup();
        let root = store
            .create(CreateContext::new(space.clone(), "plan launch").with_id("root"))
            .unwrap();
        assert_eq!(root.depth, 0);
        assert_eq!(root.root_id, "root");
        assert_eq!(root.version(), 1);

        let a = child(&store, &space, "root", "a");
        let b = child(&store, &space, "a", "b");
        assert_eq!(a.depth, 1);
        assert_eq!(b.depth, 2);
        assert_eq!(b.root_id, "root");
        assert_eq!(b.parent_id.as_deref(), Some("a"));

        let root = store.get("root").unwrap().unwrap();
        assert_eq!(root.child_ids, vec!["a"]);
        assert_eq!(root.version(), 1);
    }

    #[test]
    fn test_create_errors() {
        let (_, store, space) = setup();
        let err = store
            .create(CreateContext::new(space.clone(), "x").child_of("missing"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        let err = store.create(CreateContext::new(space.clone(), " ")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        store.create(CreateContext::new(space.clone(), "x").with_id("c1")).unwrap();
        let err = store
            .create(CreateContext::new(MemorySpaceId::from("team-b"), "y").with_id("c1"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
    }

    #[test]
    fn test_cross_space_child_needs_grant() {
        let (_, store, space) = setup();
        let other = MemorySpaceId::from("team-b");
        store.create(CreateContext::new(space.clone(), "shared").with_id("p")).unwrap();

        let err = store
            .create(CreateContext::new(other.clone(), "sub").child_of("p"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);

        let granted = store.grant_access("p", &other, "collaborate").unwrap();
        assert_eq!(granted.granted_access.len(), 1);
        assert_eq!(granted.version(), 1);

        let sub = store
            .create(CreateContext::new(other.clone(), "sub").with_id("s").child_of("p"))
            .unwrap();
        assert_eq!(sub.memory_space_id, other);
        assert_eq!(sub.depth, 1);
        assert_eq!(store.get("p").unwrap().unwrap().child_ids, vec!["s"]);

        let err = store.grant_access("p", &space, "self").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_update_versions() {
        let (db, store, space) = setup();
        let c = store
            .create(CreateContext::new(space, "task").with_id("t").data(JsonValue::from(1i64)))
            .unwrap();
        let t1 = c.updated_at;
        db.clock().advance(10);

        let done = store
            .update(
                "t",
                ContextUpdate {
                    status: Some(ContextStatus::Completed),
                    data: Some(JsonValue::from(2i64)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(done.version(), 2);
        assert_eq!(done.completed_at, Some(done.updated_at));

        let v1 = store.get_version("t", 1).unwrap().unwrap();
        assert_eq!(v1.status, ContextStatus::Active);
        assert_eq!(v1.data, Some(JsonValue::from(1i64)));
        assert_eq!(store.get_history("t").unwrap().len(), 2);

        let at = store.get_at_timestamp("t", t1).unwrap().unwrap();
        assert_eq!(at.version(), 1);
        let at = store.get_at_timestamp("t", done.updated_at).unwrap().unwrap();
        assert_eq!(at.version(), 2);
        assert!(store.get_at_timestamp("t", t1 - 1).unwrap().is_none());

        let err = store
            .update_if_version(
                "t",
                ContextUpdate {
                    description: Some("late".into()),
                    ..Default::default()
                },
                1,
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::VersionConflict);

        let err = store.update("t", ContextUpdate::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        let err = store
            .update(
                "missing",
                ContextUpdate {
                    status: Some(ContextStatus::Blocked),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_structural_changes_keep_version() {
        let (_, store, space) = setup();
        let c = store.create(CreateContext::new(space, "task").with_id("t")).unwrap();
        store.add_participant("t", "agent-1").unwrap();
        let after = store.add_participant("t", "agent-1").unwrap();
        assert_eq!(after.participants, vec!["agent-1"]);
        assert_eq!(after.version(), 1);
        assert_eq!(after.updated_at, c.updated_at);
    }

    #[test]
    fn test_delete_requires_cascade() {
        let (_, store, space) = setup();
        store.create(CreateContext::new(space.clone(), "root").with_id("r")).unwrap();
        child(&store, &space, "r", "a");
        child(&store, &space, "a", "a1");
        child(&store, &space, "a", "a2");
        child(&store, &space, "r", "b");

        let err = store.delete("a", false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StructuralError);

        let report = store.delete("a", true).unwrap();
        assert_eq!(report.deleted.len(), 3);
        assert_eq!(report.deleted.last().map(String::as_str), Some("a"));
        assert!(report.orphaned.is_empty());
        assert!(store.get("a1").unwrap().is_none());
        assert!(store.get("a2").unwrap().is_none());
        assert_eq!(store.get("r").unwrap().unwrap().child_ids, vec!["b"]);

        assert_eq!(store.delete("b", false).unwrap().deleted, vec!["b"]);
        assert!(store.get("r").unwrap().unwrap().child_ids.is_empty());
        let err = store.delete("b", false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_cascade_reports_undeletable_descendants() {
        let (db, store, space) = setup();
        let other = MemorySpaceId::from("team-b");
        let registry = MemorySpaceRegistry::new(db);
        registry
            .register(RegisterMemorySpace::new(other.clone(), SpaceType::Team))
            .unwrap();
        store.create(CreateContext::new(space.clone(), "root").with_id("r")).unwrap();
        child(&store, &space, "r", "a");
        store.grant_access("r", &other, "collaborate").unwrap();
        store
            .create(CreateContext::new(other.clone(), "sub").with_id("s").child_of("r"))
            .unwrap();
        registry.archive(&other).unwrap();

        let report = store.delete("r", true).unwrap();
        assert_eq!(report.deleted, vec!["a", "r"]);
        assert_eq!(report.orphaned, vec!["s"]);
        assert!(store.get("r").unwrap().is_none());
        let orphan = store.get("s").unwrap().unwrap();
        assert_eq!(orphan.parent_id.as_deref(), Some("r"));
    }

    #[test]
    fn test_get_chain() {
        let (_, store, space) = setup();
        store.create(CreateContext::new(space.clone(), "root").with_id("r")).unwrap();
        child(&store, &space, "r", "a");
        child(&store, &space, "a", "x");
        child(&store, &space, "a", "y");
        child(&store, &space, "x", "x1");

        let chain = store.get_chain("x").unwrap();
        assert_eq!(chain.current.context_id, "x");
        assert_eq!(chain.root.context_id, "r");
        assert_eq!(chain.parent.as_ref().map(|p| p.context_id.as_str()), Some("a"));
        let ancestors: Vec<_> = chain.ancestors.iter().map(|c| c.context_id.as_str()).collect();
        assert_eq!(ancestors, vec!["r", "a"]);
        let siblings: Vec<_> = chain.siblings.iter().map(|c| c.context_id.as_str()).collect();
        assert_eq!(siblings, vec!["y"]);
        assert_eq!(chain.children.len(), 1);
        assert_eq!(chain.depth, 2);

        let root_chain = store.get_chain("r").unwrap();
        assert_eq!(root_chain.root.context_id, "r");
        assert!(root_chain.parent.is_none());
        assert!(root_chain.siblings.is_empty());

        assert_eq!(store.get_root("x1").unwrap().context_id, "r");
        assert_eq!(store.get_children("r", false).unwrap().len(), 1);
        assert_eq!(store.get_children("r", true).unwrap().len(), 4);
    }

    #[test]
    fn test_list_and_count() {
        let (_, store, space) = setup();
        let other = MemorySpaceId::from("team-b");
        store.create(CreateContext::new(space.clone(), "one").with_id("r")).unwrap();
        child(&store, &space, "r", "a");
        store
            .create(CreateContext::new(other.clone(), "two").user("u1"))
            .unwrap();

        assert_eq!(store.count(&ContextFilter::default()).unwrap(), 3);
        let in_space = ContextFilter {
            memory_space_id: Some(space.clone()),
            ..Default::default()
        };
        let listed = store.list(&in_space).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].context_id, "a");
        let by_root = ContextFilter {
            root_id: Some("r".into()),
            depth: Some(1),
            ..Default::default()
        };
        assert_eq!(store.count(&by_root).unwrap(), 1);
        let by_user = ContextFilter {
            user_id: Some("u1".into()),
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(store.count(&by_user).unwrap(), 1);
        assert!(store.list(&by_user).unwrap().is_empty());
    }

    #[test]
    fn test_archived_space_rejects_writes() {
        let (db, store, space) = setup();
        store.create(CreateContext::new(space.clone(), "task").with_id("t")).unwrap();
        let registry = MemorySpaceRegistry::new(db);
        registry
            .register(RegisterMemorySpace::new(space.clone(), SpaceType::Team))
            .unwrap();
        registry.archive(&space).unwrap();

        let err = store
            .update(
                "t",
                ContextUpdate {
                    status: Some(ContextStatus::Cancelled),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        let err = store.create(CreateContext::new(space, "more")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        assert!(store.get("t").unwrap().is_some());
    }

    #[test]
    fn test_purge_all() {
        let (_, store, space) = setup();
        store.create(CreateContext::new(space.clone(), "a")).unwrap();
        store.create(CreateContext::new(space, "b")).unwrap();
        assert_eq!(store.purge_all().unwrap(), 2);
        assert_eq!(store.count(&ContextFilter::default()).unwrap(), 0);
    }
}
