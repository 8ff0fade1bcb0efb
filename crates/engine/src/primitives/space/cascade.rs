//! Per-layer removal of a memory space's records
//!
//! Each layer is dropped on its own, one after another; there is no
//! rollback if a later layer fails. Contexts are dropped first so that
//! parents in other spaces can be detached while the records are at hand.

use std::sync::Arc;

use cortex_core::{MemorySpaceId, Scope};

use super::types::{CascadeReport, MemorySpaceStats};
use crate::database::Database;
use crate::primitives::conversation::ConversationStore;

/// Record counts for every layer of a space
pub(crate) fn counts(db: &Arc<Database>, space: &MemorySpaceId, participants: usize) -> MemorySpaceStats {
    let scope = Scope::from(space);
    let tables = &db.tables;
    MemorySpaceStats {
        memory_space_id: space.clone(),
        conversations: tables.conversations.scope_len(&scope),
        messages: ConversationStore::new(db.clone()).message_total(space),
        immutable_records: tables.immutable.scope_len(&scope),
        mutable_entries: tables.mutable.scope_len(&scope),
        memories: tables.memories.scope_len(&scope),
        facts: tables.facts.scope_len(&scope),
        contexts: tables.contexts.scope_len(&scope),
        participants,
    }
}

/// Drop every record of a space in every layer
pub(crate) fn purge_space(db: &Database, space: &MemorySpaceId) -> CascadeReport {
    let scope = Scope::from(space);
    let tables = &db.tables;

    let (contexts, orphaned_contexts) = purge_contexts(db, space);
    let report = CascadeReport {
        memory_space_id: space.clone(),
        contexts,
        facts: tables.facts.remove_scope(&scope),
        memories: tables.memories.remove_scope(&scope),
        mutable_entries: tables.mutable.remove_scope(&scope),
        immutable_records: tables.immutable.remove_scope(&scope),
        conversations: tables.conversations.remove_scope(&scope),
        orphaned_contexts,
    };

    tracing::debug!(
        target: "cortex::space",
        memory_space = %space,
        contexts = report.contexts,
        facts = report.facts,
        memories = report.memories,
        mutable_entries = report.mutable_entries,
        immutable_records = report.immutable_records,
        conversations = report.conversations,
        "memory space records dropped"
    );
    report
}

/// Drop a space's contexts, detaching them from parents elsewhere
///
/// Returns the number removed and the ids of contexts in other spaces left
/// without a parent.
fn purge_contexts(db: &Database, space: &MemorySpaceId) -> (usize, Vec<String>) {
    let scope = Scope::from(space);
    let contexts = &db.tables.contexts;
    let removed = contexts.scan(&scope, |_, _| true);
    contexts.remove_scope(&scope);

    let mut orphaned = Vec::new();
    for ctx in &removed {
        if let Some(parent_id) = &ctx.parent_id {
            if let Some(parent_scope) = contexts.locate(parent_id) {
                contexts.with_shard_mut(&parent_scope, |shard| {
                    shard.update(parent_id, |p| p.child_ids.retain(|c| c != &ctx.context_id))
                });
            }
        }
        for child_id in &ctx.child_ids {
            if contexts.locate(child_id).is_some() {
                tracing::warn!(
                    target: "cortex::space",
                    memory_space = %space,
                    context_id = %child_id,
                    parent_id = %ctx.context_id,
                    "context orphaned by space deletion"
                );
                orphaned.push(child_id.clone());
            }
        }
    }
    (removed.len(), orphaned)
}
