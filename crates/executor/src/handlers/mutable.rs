//! Mutable key-value command handlers.

use std::sync::Arc;

use cortex_core::{JsonValue, MemorySpaceId};
use cortex_engine::{MutableFilter, SetOptions, TransactionOp, UpdateOp};

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::{Output, Result};

// =============================================================================
// Writes
// =============================================================================

/// Handle MutableSet command.
pub fn mutable_set(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
    key: String,
    value: JsonValue,
    options: SetOptions,
) -> Result<Output> {
    let record = convert_result(p.mutable.set(&space, &namespace, &key, value, options))?;
    Ok(Output::Mutable(record))
}

/// Handle MutableUpdate command: apply one atomic operator.
pub fn mutable_update(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
    key: String,
    op: UpdateOp,
) -> Result<Output> {
    let record = convert_result(p.mutable.update(&space, &namespace, &key, op))?;
    Ok(Output::Mutable(record))
}

/// Handle MutableIncrement command.
pub fn mutable_increment(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
    key: String,
    amount: JsonValue,
) -> Result<Output> {
    let record = convert_result(p.mutable.increment(&space, &namespace, &key, amount))?;
    Ok(Output::Mutable(record))
}

/// Handle MutableDecrement command.
pub fn mutable_decrement(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
    key: String,
    amount: JsonValue,
) -> Result<Output> {
    let record = convert_result(p.mutable.decrement(&space, &namespace, &key, amount))?;
    Ok(Output::Mutable(record))
}

/// Handle MutableAppend command.
pub fn mutable_append(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
    key: String,
    element: JsonValue,
) -> Result<Output> {
    let record = convert_result(p.mutable.append(&space, &namespace, &key, element))?;
    Ok(Output::Mutable(record))
}

/// Handle MutableDelete command.
pub fn mutable_delete(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
    key: String,
) -> Result<Output> {
    let record = convert_result(p.mutable.delete(&space, &namespace, &key))?;
    Ok(Output::Mutable(record))
}

/// Handle MutableTransaction command.
pub fn mutable_transaction(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    ops: Vec<TransactionOp>,
) -> Result<Output> {
    let result = convert_result(p.mutable.transaction(&space, ops))?;
    Ok(Output::Transaction(result))
}

/// Handle MutablePurgeNamespace command.
pub fn mutable_purge_namespace(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
) -> Result<Output> {
    Ok(Output::Count(convert_result(p.mutable.purge_namespace(&space, &namespace))?))
}

/// Handle MutablePurgeAll command.
pub fn mutable_purge_all(p: &Arc<Primitives>) -> Result<Output> {
    Ok(Output::Count(convert_result(p.mutable.purge_all())?))
}

// =============================================================================
// Reads
// =============================================================================

/// Handle MutableGet command.
pub fn mutable_get(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
    key: String,
) -> Result<Output> {
    let record = convert_result(p.mutable.get(&space, &namespace, &key))?;
    Ok(Output::MaybeMutable(record))
}

/// Handle MutableExists command.
pub fn mutable_exists(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    namespace: String,
    key: String,
) -> Result<Output> {
    Ok(Output::Bool(convert_result(p.mutable.exists(&space, &namespace, &key))?))
}

/// Handle MutableList command.
pub fn mutable_list(p: &Arc<Primitives>, space: MemorySpaceId, filter: MutableFilter) -> Result<Output> {
    Ok(Output::Mutables(convert_result(p.mutable.list(&space, &filter))?))
}

/// Handle MutableCount command.
pub fn mutable_count(p: &Arc<Primitives>, space: MemorySpaceId, filter: MutableFilter) -> Result<Output> {
    Ok(Output::Count(convert_result(p.mutable.count(&space, &filter))?))
}
