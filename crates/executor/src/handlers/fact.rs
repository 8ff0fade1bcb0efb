//! Fact command handlers.

use std::sync::Arc;

use cortex_core::MemorySpaceId;
use cortex_engine::{ExportFormat, FactFilter, FactUpdate, StoreFact};

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::{Output, Result};

// =============================================================================
// Writes
// =============================================================================

/// Handle FactStore command.
pub fn fact_store(p: &Arc<Primitives>, space: MemorySpaceId, input: StoreFact) -> Result<Output> {
    Ok(Output::Fact(convert_result(p.facts.store(&space, input))?))
}

/// Handle FactUpdate command.
///
/// Returns the new fact that supersedes `fact_id`.
pub fn fact_update(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    fact_id: String,
    update: FactUpdate,
    reason: Option<String>,
) -> Result<Output> {
    Ok(Output::Fact(convert_result(p.facts.update(&space, &fact_id, update, reason))?))
}

/// Handle FactUpdateInPlace command.
pub fn fact_update_in_place(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    fact_id: String,
    update: FactUpdate,
) -> Result<Output> {
    Ok(Output::Fact(convert_result(p.facts.update_in_place(&space, &fact_id, update))?))
}

/// Handle FactSupersede command.
pub fn fact_supersede(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    old_fact_id: String,
    new_fact_id: String,
    reason: Option<String>,
) -> Result<Output> {
    let record = convert_result(p.facts.supersede(&space, &old_fact_id, &new_fact_id, reason))?;
    Ok(Output::Fact(record))
}

/// Handle FactConsolidate command.
pub fn fact_consolidate(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    fact_ids: Vec<String>,
    keep_fact_id: String,
) -> Result<Output> {
    let record = convert_result(p.facts.consolidate(&space, &fact_ids, &keep_fact_id))?;
    Ok(Output::Fact(record))
}

/// Handle FactDelete command (soft delete).
pub fn fact_delete(p: &Arc<Primitives>, space: MemorySpaceId, fact_id: String) -> Result<Output> {
    Ok(Output::Fact(convert_result(p.facts.delete(&space, &fact_id))?))
}

/// Handle FactPurgeAll command.
pub fn fact_purge_all(p: &Arc<Primitives>) -> Result<Output> {
    Ok(Output::Count(convert_result(p.facts.purge_all())?))
}

// =============================================================================
// Reads
// =============================================================================

/// Handle FactGet command.
pub fn fact_get(p: &Arc<Primitives>, space: MemorySpaceId, fact_id: String) -> Result<Output> {
    Ok(Output::MaybeFact(convert_result(p.facts.get(&space, &fact_id))?))
}

/// Handle FactHistory command: the supersession chain, oldest first.
pub fn fact_history(p: &Arc<Primitives>, space: MemorySpaceId, fact_id: String) -> Result<Output> {
    Ok(Output::Facts(convert_result(p.facts.get_history(&space, &fact_id))?))
}

/// Handle FactQueryBySubject command.
pub fn fact_query_by_subject(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    subject: String,
    include_superseded: bool,
) -> Result<Output> {
    let facts = convert_result(p.facts.query_by_subject(&space, &subject, include_superseded))?;
    Ok(Output::Facts(facts))
}

/// Handle FactQueryByRelationship command.
pub fn fact_query_by_relationship(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    subject: String,
    predicate: String,
    include_superseded: bool,
) -> Result<Output> {
    let facts = convert_result(p.facts.query_by_relationship(
        &space,
        &subject,
        &predicate,
        include_superseded,
    ))?;
    Ok(Output::Facts(facts))
}

/// Handle FactList command.
pub fn fact_list(p: &Arc<Primitives>, space: MemorySpaceId, filter: FactFilter) -> Result<Output> {
    Ok(Output::Facts(convert_result(p.facts.list(&space, &filter))?))
}

/// Handle FactCount command.
pub fn fact_count(p: &Arc<Primitives>, space: MemorySpaceId, filter: FactFilter) -> Result<Output> {
    Ok(Output::Count(convert_result(p.facts.count(&space, &filter))?))
}

/// Handle FactSearch command.
pub fn fact_search(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    query: String,
    filter: FactFilter,
) -> Result<Output> {
    Ok(Output::Facts(convert_result(p.facts.search(&space, &query, &filter))?))
}

/// Handle FactExport command.
pub fn fact_export(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    filter: FactFilter,
    format: ExportFormat,
) -> Result<Output> {
    Ok(Output::Text(convert_result(p.facts.export(&space, &filter, format))?))
}
