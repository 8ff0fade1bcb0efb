//! Immutable record command handlers.
//!
//! Records live in a memory space, or globally when `space` is absent.

use std::sync::Arc;

use cortex_core::{MemorySpaceId, Millis};
use cortex_engine::{ImmutableEntry, ImmutableFilter};

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::{Output, Result};

// =============================================================================
// Writes
// =============================================================================

/// Handle ImmutableStore command.
///
/// With `expected_version`, the write only lands if the stored record is
/// still at that version.
pub fn immutable_store(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    entry: ImmutableEntry,
    expected_version: Option<u64>,
) -> Result<Output> {
    let record = match expected_version {
        Some(v) => convert_result(p.immutable.store_if_version(space.as_ref(), entry, v))?,
        None => convert_result(p.immutable.store(space.as_ref(), entry))?,
    };
    Ok(Output::Immutable(record))
}

/// Handle ImmutablePurge command.
pub fn immutable_purge(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    record_type: String,
    id: String,
) -> Result<Output> {
    let record = convert_result(p.immutable.purge(space.as_ref(), &record_type, &id))?;
    Ok(Output::Immutable(record))
}

/// Handle ImmutablePurgeMany command.
pub fn immutable_purge_many(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    filter: ImmutableFilter,
) -> Result<Output> {
    Ok(Output::Count(convert_result(p.immutable.purge_many(space.as_ref(), &filter))?))
}

/// Handle ImmutablePurgeVersions command.
pub fn immutable_purge_versions(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    record_type: String,
    id: String,
    keep_latest: usize,
) -> Result<Output> {
    let result = convert_result(p.immutable.purge_versions(
        space.as_ref(),
        &record_type,
        &id,
        keep_latest,
    ))?;
    Ok(Output::VersionsPurged(result))
}

/// Handle ImmutablePurgeAll command.
pub fn immutable_purge_all(p: &Arc<Primitives>) -> Result<Output> {
    Ok(Output::Count(convert_result(p.immutable.purge_all())?))
}

// =============================================================================
// Reads
// =============================================================================

/// Handle ImmutableGet command.
pub fn immutable_get(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    record_type: String,
    id: String,
) -> Result<Output> {
    let record = convert_result(p.immutable.get(space.as_ref(), &record_type, &id))?;
    Ok(Output::MaybeImmutable(record))
}

/// Handle ImmutableGetVersion command.
pub fn immutable_get_version(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    record_type: String,
    id: String,
    version: u64,
) -> Result<Output> {
    let record = convert_result(p.immutable.get_version(space.as_ref(), &record_type, &id, version))?;
    Ok(Output::MaybeImmutable(record))
}

/// Handle ImmutableHistory command: every retained version, oldest first.
pub fn immutable_history(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    record_type: String,
    id: String,
) -> Result<Output> {
    let versions = convert_result(p.immutable.get_history(space.as_ref(), &record_type, &id))?;
    Ok(Output::Immutables(versions))
}

/// Handle ImmutableGetAt command (time-travel read).
pub fn immutable_get_at(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    record_type: String,
    id: String,
    timestamp: Millis,
) -> Result<Output> {
    let record = convert_result(p.immutable.get_at_timestamp(
        space.as_ref(),
        &record_type,
        &id,
        timestamp,
    ))?;
    Ok(Output::MaybeImmutable(record))
}

/// Handle ImmutableList command.
pub fn immutable_list(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    filter: ImmutableFilter,
) -> Result<Output> {
    Ok(Output::Immutables(convert_result(p.immutable.list(space.as_ref(), &filter))?))
}

/// Handle ImmutableSearch command.
pub fn immutable_search(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    query: String,
    filter: ImmutableFilter,
) -> Result<Output> {
    let records = convert_result(p.immutable.search(space.as_ref(), &query, &filter))?;
    Ok(Output::Immutables(records))
}

/// Handle ImmutableCount command.
pub fn immutable_count(
    p: &Arc<Primitives>,
    space: Option<MemorySpaceId>,
    filter: ImmutableFilter,
) -> Result<Output> {
    Ok(Output::Count(convert_result(p.immutable.count(space.as_ref(), &filter))?))
}
