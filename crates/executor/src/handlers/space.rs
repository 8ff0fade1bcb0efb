//! Memory space registry command handlers.

use std::sync::Arc;

use cortex_core::MemorySpaceId;
use cortex_engine::{MemorySpaceFilter, MemorySpaceUpdate, NewParticipant, RegisterMemorySpace};

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::{Output, Result};

/// Handle SpaceRegister command.
pub fn space_register(p: &Arc<Primitives>, input: RegisterMemorySpace) -> Result<Output> {
    let space = convert_result(p.spaces.register(input))?;
    Ok(Output::Space(space))
}

/// Handle SpaceUpdate command.
pub fn space_update(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    update: MemorySpaceUpdate,
) -> Result<Output> {
    let record = convert_result(p.spaces.update(&space, update))?;
    Ok(Output::Space(record))
}

/// Handle SpaceAddParticipant command.
pub fn space_add_participant(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    participant: NewParticipant,
) -> Result<Output> {
    let record = convert_result(p.spaces.add_participant(&space, participant))?;
    Ok(Output::Space(record))
}

/// Handle SpaceRemoveParticipant command.
pub fn space_remove_participant(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    participant_id: String,
) -> Result<Output> {
    let record = convert_result(p.spaces.remove_participant(&space, &participant_id))?;
    Ok(Output::Space(record))
}

/// Handle SpaceArchive command.
pub fn space_archive(p: &Arc<Primitives>, space: MemorySpaceId) -> Result<Output> {
    Ok(Output::Space(convert_result(p.spaces.archive(&space))?))
}

/// Handle SpaceReactivate command.
pub fn space_reactivate(p: &Arc<Primitives>, space: MemorySpaceId) -> Result<Output> {
    Ok(Output::Space(convert_result(p.spaces.reactivate(&space))?))
}

/// Handle SpaceDelete command.
///
/// Returns the per-layer report of what the deletion removed.
pub fn space_delete(p: &Arc<Primitives>, space: MemorySpaceId, cascade: bool) -> Result<Output> {
    let report = convert_result(p.spaces.delete(&space, cascade))?;
    Ok(Output::Cascade(report))
}

/// Handle SpaceGet command.
pub fn space_get(p: &Arc<Primitives>, space: MemorySpaceId) -> Result<Output> {
    Ok(Output::MaybeSpace(convert_result(p.spaces.get(&space))?))
}

/// Handle SpaceList command.
pub fn space_list(p: &Arc<Primitives>, filter: MemorySpaceFilter) -> Result<Output> {
    Ok(Output::Spaces(convert_result(p.spaces.list(&filter))?))
}

/// Handle SpaceCount command.
pub fn space_count(p: &Arc<Primitives>, filter: MemorySpaceFilter) -> Result<Output> {
    Ok(Output::Count(convert_result(p.spaces.count(&filter))?))
}

/// Handle SpaceStats command.
pub fn space_stats(p: &Arc<Primitives>, space: MemorySpaceId) -> Result<Output> {
    Ok(Output::SpaceStats(convert_result(p.spaces.stats(&space))?))
}

/// Handle SpacePurgeAll command.
pub fn space_purge_all(p: &Arc<Primitives>) -> Result<Output> {
    Ok(Output::Count(convert_result(p.spaces.purge_all())?))
}
