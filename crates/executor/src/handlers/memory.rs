//! Vector memory command handlers, including streaming writes.

use std::sync::Arc;

use cortex_core::{MemorySpaceId, Metadata, Millis};
use cortex_engine::{MemoryFilter, MemorySearch, MemoryUpdate, StoreMemory};

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::{Output, Result};

// =============================================================================
// Writes
// =============================================================================

/// Handle MemoryStore command.
pub fn memory_store(p: &Arc<Primitives>, space: MemorySpaceId, input: StoreMemory) -> Result<Output> {
    Ok(Output::Memory(convert_result(p.memories.store(&space, input))?))
}

/// Handle MemoryUpdate command.
///
/// Every update creates a new version. With `expected_version`, the update
/// only lands if the memory is still at that version.
pub fn memory_update(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    memory_id: String,
    update: MemoryUpdate,
    expected_version: Option<u64>,
) -> Result<Output> {
    let record = match expected_version {
        Some(v) => convert_result(p.memories.update_if_version(&space, &memory_id, update, v))?,
        None => convert_result(p.memories.update(&space, &memory_id, update))?,
    };
    Ok(Output::Memory(record))
}

/// Handle MemoryRecordAccess command.
pub fn memory_record_access(p: &Arc<Primitives>, space: MemorySpaceId, memory_id: String) -> Result<Output> {
    Ok(Output::Memory(convert_result(p.memories.record_access(&space, &memory_id))?))
}

/// Handle MemoryDelete command.
pub fn memory_delete(p: &Arc<Primitives>, space: MemorySpaceId, memory_id: String) -> Result<Output> {
    Ok(Output::Memory(convert_result(p.memories.delete(&space, &memory_id))?))
}

/// Handle MemoryDeleteMany command.
pub fn memory_delete_many(p: &Arc<Primitives>, space: MemorySpaceId, filter: MemoryFilter) -> Result<Output> {
    Ok(Output::Count(convert_result(p.memories.delete_many(&space, &filter))?))
}

/// Handle MemoryPurgeVersions command.
pub fn memory_purge_versions(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    memory_id: String,
    keep_latest: usize,
) -> Result<Output> {
    let result = convert_result(p.memories.purge_versions(&space, &memory_id, keep_latest))?;
    Ok(Output::VersionsPurged(result))
}

/// Handle MemoryPurgeAll command.
pub fn memory_purge_all(p: &Arc<Primitives>) -> Result<Output> {
    Ok(Output::Count(convert_result(p.memories.purge_all())?))
}

// =============================================================================
// Streaming
// =============================================================================

/// Handle MemoryStorePartial command.
pub fn memory_store_partial(p: &Arc<Primitives>, space: MemorySpaceId, input: StoreMemory) -> Result<Output> {
    Ok(Output::Memory(convert_result(p.memories.store_partial(&space, input))?))
}

/// Handle MemoryUpdatePartial command.
pub fn memory_update_partial(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    memory_id: String,
    content: String,
    metadata: Option<Metadata>,
) -> Result<Output> {
    let record = convert_result(p.memories.update_partial(&space, &memory_id, content, metadata))?;
    Ok(Output::Memory(record))
}

/// Handle MemoryFinalizePartial command.
pub fn memory_finalize_partial(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    memory_id: String,
    content: Option<String>,
    embedding: Option<Vec<f32>>,
) -> Result<Output> {
    let record = convert_result(p.memories.finalize_partial(&space, &memory_id, content, embedding))?;
    Ok(Output::Memory(record))
}

// =============================================================================
// Reads
// =============================================================================

/// Handle MemoryGet command.
pub fn memory_get(p: &Arc<Primitives>, space: MemorySpaceId, memory_id: String) -> Result<Output> {
    Ok(Output::MaybeMemory(convert_result(p.memories.get(&space, &memory_id))?))
}

/// Handle MemoryGetVersion command.
pub fn memory_get_version(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    memory_id: String,
    version: u64,
) -> Result<Output> {
    let record = convert_result(p.memories.get_version(&space, &memory_id, version))?;
    Ok(Output::MaybeMemory(record))
}

/// Handle MemoryHistory command.
pub fn memory_history(p: &Arc<Primitives>, space: MemorySpaceId, memory_id: String) -> Result<Output> {
    Ok(Output::Memories(convert_result(p.memories.get_history(&space, &memory_id))?))
}

/// Handle MemoryGetAt command (time-travel read).
pub fn memory_get_at(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    memory_id: String,
    timestamp: Millis,
) -> Result<Output> {
    let record = convert_result(p.memories.get_at_timestamp(&space, &memory_id, timestamp))?;
    Ok(Output::MaybeMemory(record))
}

/// Handle MemoryList command.
pub fn memory_list(p: &Arc<Primitives>, space: MemorySpaceId, filter: MemoryFilter) -> Result<Output> {
    Ok(Output::Memories(convert_result(p.memories.list(&space, &filter))?))
}

/// Handle MemoryCount command.
pub fn memory_count(p: &Arc<Primitives>, space: MemorySpaceId, filter: MemoryFilter) -> Result<Output> {
    Ok(Output::Count(convert_result(p.memories.count(&space, &filter))?))
}

/// Handle MemorySearch command.
pub fn memory_search(p: &Arc<Primitives>, space: MemorySpaceId, search: MemorySearch) -> Result<Output> {
    Ok(Output::MemoryHits(convert_result(p.memories.search(&space, &search))?))
}
