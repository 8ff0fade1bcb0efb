//! Agent-to-agent messaging command handlers.

use std::sync::Arc;

use cortex_core::MemorySpaceId;
use cortex_engine::A2ASendOptions;

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::{Output, Result};

/// Handle A2aSend command.
pub fn a2a_send(
    p: &Arc<Primitives>,
    from: MemorySpaceId,
    to: MemorySpaceId,
    message: String,
    options: A2ASendOptions,
) -> Result<Output> {
    let sent = convert_result(p.a2a.send(&from, &to, &message, &options))?;
    Ok(Output::A2aSent(sent))
}

/// Handle A2aBroadcast command.
pub fn a2a_broadcast(
    p: &Arc<Primitives>,
    from: MemorySpaceId,
    recipients: Vec<MemorySpaceId>,
    message: String,
    options: A2ASendOptions,
) -> Result<Output> {
    let result = convert_result(p.a2a.broadcast(&from, &recipients, &message, &options))?;
    Ok(Output::A2aBroadcast(result))
}

/// Handle A2aConversation command.
pub fn a2a_conversation(p: &Arc<Primitives>, a: MemorySpaceId, b: MemorySpaceId) -> Result<Output> {
    Ok(Output::MaybeConversation(convert_result(p.a2a.get_conversation(&a, &b))?))
}
