//! Iterative context tree traversal
//!
//! Contexts reference each other by id and the tree is user-controlled, so
//! walks use an explicit queue and a visited set instead of recursion.
//! Walking up treats a missing parent as an orphan and a revisit as a cycle.
//! Walking down skips dangling child ids.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use cortex_core::{CortexError, CortexResult};

use super::types::ContextRecord;

/// Ancestors of `start`, root first, parent last
///
/// # Errors
///
/// `STRUCTURAL_ERROR` if a parent is missing or the parent links loop.
pub(crate) fn ancestors(
    lookup: impl Fn(&str) -> Option<ContextRecord>,
    start: &ContextRecord,
) -> CortexResult<Vec<ContextRecord>> {
    let mut visited: FxHashSet<String> = FxHashSet::default();
    visited.insert(start.context_id.clone());

    let mut out = Vec::new();
    let mut child_id = start.context_id.clone();
    let mut next = start.parent_id.clone();
    while let Some(parent_id) = next {
        if !visited.insert(parent_id.clone()) {
            return Err(CortexError::structural(format!(
                "context tree has a cycle at {}",
                parent_id
            )));
        }
        let parent = lookup(&parent_id).ok_or_else(|| {
            CortexError::structural(format!(
                "context {} is orphaned: parent {} does not exist",
                child_id, parent_id
            ))
        })?;
        next = parent.parent_id.clone();
        child_id = parent.context_id.clone();
        out.push(parent);
    }
    out.reverse();
    Ok(out)
}

/// Every context below `start` in breadth-first order, `start` excluded
pub(crate) fn descendants(
    lookup: impl Fn(&str) -> Option<ContextRecord>,
    start: &ContextRecord,
) -> Vec<ContextRecord> {
    let mut visited: FxHashSet<String> = FxHashSet::default();
    visited.insert(start.context_id.clone());

    let mut queue: VecDeque<String> = start.child_ids.iter().cloned().collect();
    let mut out = Vec::new();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        match lookup(&id) {
            Some(child) => {
                queue.extend(child.child_ids.iter().cloned());
                out.push(child);
            }
            None => tracing::warn!(
                target: "cortex::context",
                context_id = %id,
                parent_id = %start.context_id,
                "dangling child reference skipped"
            ),
        }
    }
    out
}

/// Resolve ids to records, dropping ids that no longer exist
pub(crate) fn resolve(
    lookup: impl Fn(&str) -> Option<ContextRecord>,
    ids: &[String],
) -> Vec<ContextRecord> {
    ids.iter().filter_map(|id| lookup(id)).collect()
}
