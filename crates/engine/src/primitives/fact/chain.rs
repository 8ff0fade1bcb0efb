//! Supersession chain traversal
//!
//! Facts link to each other by id, forming a doubly-linked list of beliefs:
//! `supersedes` points back to the older fact, `superseded_by` forward to
//! the newer one. Nothing stops a caller from wiring a loop, so every walk
//! tracks what it has visited and gives up past a configured length.
//!
//! Links to facts that no longer exist end the walk quietly.

use rustc_hash::FxHashSet;

use cortex_core::{CortexError, CortexResult};

use super::types::FactRecord;

fn cycle_at(fact_id: &str) -> CortexError {
    CortexError::structural(format!("supersession chain has a cycle at {}", fact_id))
}

fn too_long(max_len: usize) -> CortexError {
    CortexError::structural(format!(
        "supersession chain is longer than {} facts",
        max_len
    ))
}

/// The full chain through `start`, oldest first
///
/// # Errors
///
/// `STRUCTURAL_ERROR` if the chain loops or exceeds `max_len`.
pub(crate) fn history<'a>(
    lookup: impl Fn(&str) -> Option<&'a FactRecord>,
    start: &'a FactRecord,
    max_len: usize,
) -> CortexResult<Vec<&'a FactRecord>> {
    let mut visited: FxHashSet<&str> = FxHashSet::default();
    visited.insert(start.fact_id.as_str());

    let mut older = Vec::new();
    let mut cursor = start;
    while let Some(prev) = cursor.supersedes.as_deref().and_then(&lookup) {
        if !visited.insert(prev.fact_id.as_str()) {
            return Err(cycle_at(&prev.fact_id));
        }
        if visited.len() > max_len {
            return Err(too_long(max_len));
        }
        older.push(prev);
        cursor = prev;
    }

    let mut chain: Vec<&FactRecord> = older.into_iter().rev().collect();
    chain.push(start);

    let mut cursor = start;
    while let Some(next) = cursor.superseded_by.as_deref().and_then(&lookup) {
        if !visited.insert(next.fact_id.as_str()) {
            return Err(cycle_at(&next.fact_id));
        }
        if visited.len() > max_len {
            return Err(too_long(max_len));
        }
        chain.push(next);
        cursor = next;
    }
    Ok(chain)
}

/// True if linking `older -> newer` would close a loop
///
/// That is the case when `older` is already reachable going forward from
/// `newer`. A walk that runs past `max_len` is treated as a loop.
pub(crate) fn would_cycle<'a>(
    lookup: impl Fn(&str) -> Option<&'a FactRecord>,
    older_id: &str,
    newer: &'a FactRecord,
    max_len: usize,
) -> bool {
    if newer.fact_id == older_id {
        return true;
    }
    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut cursor = newer;
    while let Some(next_id) = cursor.superseded_by.as_deref() {
        if next_id == older_id || !visited.insert(next_id) || visited.len() > max_len {
            return true;
        }
        match lookup(next_id) {
            Some(next) => cursor = next,
            None => return false,
        }
    }
    false
}

/// Arithmetic mean of confidences, rounded half away from zero
pub(crate) fn mean_confidence(confidences: impl IntoIterator<Item = u8>) -> Option<u8> {
    let (sum, n) = confidences
        .into_iter()
        .fold((0u32, 0u32), |(sum, n), c| (sum + u32::from(c), n + 1));
    if n == 0 {
        return None;
    }
    Some((f64::from(sum) / f64::from(n)).round() as u8)
}
