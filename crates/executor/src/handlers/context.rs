//! Context command handlers.
//!
//! Context ids are global, so most commands carry no memory space.

use std::sync::Arc;

use cortex_core::{MemorySpaceId, Millis};
use cortex_engine::{ContextFilter, ContextUpdate, CreateContext};

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::{Output, Result};

// =============================================================================
// Writes
// =============================================================================

/// Handle ContextCreate command.
pub fn context_create(p: &Arc<Primitives>, input: CreateContext) -> Result<Output> {
    Ok(Output::Context(convert_result(p.contexts.create(input))?))
}

/// Handle ContextUpdate command.
pub fn context_update(
    p: &Arc<Primitives>,
    context_id: String,
    update: ContextUpdate,
    expected_version: Option<u64>,
) -> Result<Output> {
    let record = match expected_version {
        Some(v) => convert_result(p.contexts.update_if_version(&context_id, update, v))?,
        None => convert_result(p.contexts.update(&context_id, update))?,
    };
    Ok(Output::Context(record))
}

/// Handle ContextDelete command.
///
/// Reports the contexts removed and any descendant left behind.
pub fn context_delete(p: &Arc<Primitives>, context_id: String, cascade: bool) -> Result<Output> {
    Ok(Output::ContextDeleted(convert_result(p.contexts.delete(&context_id, cascade))?))
}

/// Handle ContextAddParticipant command.
pub fn context_add_participant(
    p: &Arc<Primitives>,
    context_id: String,
    participant_id: String,
) -> Result<Output> {
    let record = convert_result(p.contexts.add_participant(&context_id, &participant_id))?;
    Ok(Output::Context(record))
}

/// Handle ContextGrantAccess command.
pub fn context_grant_access(
    p: &Arc<Primitives>,
    context_id: String,
    space: MemorySpaceId,
    scope: String,
) -> Result<Output> {
    let record = convert_result(p.contexts.grant_access(&context_id, &space, scope))?;
    Ok(Output::Context(record))
}

/// Handle ContextPurgeAll command.
pub fn context_purge_all(p: &Arc<Primitives>) -> Result<Output> {
    Ok(Output::Count(convert_result(p.contexts.purge_all())?))
}

// =============================================================================
// Reads
// =============================================================================

/// Handle ContextGet command.
pub fn context_get(p: &Arc<Primitives>, context_id: String) -> Result<Output> {
    Ok(Output::MaybeContext(convert_result(p.contexts.get(&context_id))?))
}

/// Handle ContextChain command.
pub fn context_chain(p: &Arc<Primitives>, context_id: String) -> Result<Output> {
    Ok(Output::ContextChain(convert_result(p.contexts.get_chain(&context_id))?))
}

/// Handle ContextRoot command.
pub fn context_root(p: &Arc<Primitives>, context_id: String) -> Result<Output> {
    Ok(Output::Context(convert_result(p.contexts.get_root(&context_id))?))
}

/// Handle ContextChildren command.
pub fn context_children(p: &Arc<Primitives>, context_id: String, recursive: bool) -> Result<Output> {
    let children = convert_result(p.contexts.get_children(&context_id, recursive))?;
    Ok(Output::Contexts(children))
}

/// Handle ContextList command.
pub fn context_list(p: &Arc<Primitives>, filter: ContextFilter) -> Result<Output> {
    Ok(Output::Contexts(convert_result(p.contexts.list(&filter))?))
}

/// Handle ContextCount command.
pub fn context_count(p: &Arc<Primitives>, filter: ContextFilter) -> Result<Output> {
    Ok(Output::Count(convert_result(p.contexts.count(&filter))?))
}

/// Handle ContextGetVersion command.
pub fn context_get_version(p: &Arc<Primitives>, context_id: String, version: u64) -> Result<Output> {
    let record = convert_result(p.contexts.get_version(&context_id, version))?;
    Ok(Output::MaybeContext(record))
}

/// Handle ContextHistory command.
pub fn context_history(p: &Arc<Primitives>, context_id: String) -> Result<Output> {
    Ok(Output::Contexts(convert_result(p.contexts.get_history(&context_id))?))
}

/// Handle ContextGetAt command (time-travel read).
pub fn context_get_at(p: &Arc<Primitives>, context_id: String, timestamp: Millis) -> Result<Output> {
    let record = convert_result(p.contexts.get_at_timestamp(&context_id, timestamp))?;
    Ok(Output::MaybeContext(record))
}
