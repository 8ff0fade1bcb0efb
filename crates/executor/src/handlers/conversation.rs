//! Conversation command handlers.

use std::sync::Arc;

use cortex_core::MemorySpaceId;
use cortex_engine::{
    ConversationFilter, CreateConversation, ExportFormat, HistoryOptions, NewMessage,
    SearchConversations,
};

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::{Output, Result};

// =============================================================================
// Writes
// =============================================================================

/// Handle ConversationCreate command.
pub fn conversation_create(p: &Arc<Primitives>, input: CreateConversation) -> Result<Output> {
    let record = convert_result(p.conversations.create(input))?;
    Ok(Output::Conversation(record))
}

/// Handle ConversationAddMessage command.
///
/// Returns the conversation with the new message appended.
pub fn conversation_add_message(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    conversation_id: String,
    message: NewMessage,
) -> Result<Output> {
    let record = convert_result(p.conversations.add_message(&space, &conversation_id, message))?;
    Ok(Output::Conversation(record))
}

/// Handle ConversationDelete command.
pub fn conversation_delete(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    conversation_id: String,
) -> Result<Output> {
    let record = convert_result(p.conversations.delete(&space, &conversation_id))?;
    Ok(Output::Conversation(record))
}

/// Handle ConversationDeleteMany command.
pub fn conversation_delete_many(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    filter: ConversationFilter,
) -> Result<Output> {
    let removed = convert_result(p.conversations.delete_many(&space, &filter))?;
    Ok(Output::Count(removed))
}

/// Handle ConversationPurgeAll command.
pub fn conversation_purge_all(p: &Arc<Primitives>) -> Result<Output> {
    Ok(Output::Count(convert_result(p.conversations.purge_all())?))
}

// =============================================================================
// Reads
// =============================================================================

/// Handle ConversationGet command.
pub fn conversation_get(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    conversation_id: String,
) -> Result<Output> {
    let record = convert_result(p.conversations.get(&space, &conversation_id))?;
    Ok(Output::MaybeConversation(record))
}

/// Handle ConversationHistory command.
pub fn conversation_history(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    conversation_id: String,
    options: HistoryOptions,
) -> Result<Output> {
    let page = convert_result(p.conversations.get_history(&space, &conversation_id, &options))?;
    Ok(Output::History(page))
}

/// Handle ConversationGetMessage command.
pub fn conversation_get_message(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    conversation_id: String,
    message_id: String,
) -> Result<Output> {
    let message = convert_result(p.conversations.get_message(&space, &conversation_id, &message_id))?;
    Ok(Output::MaybeMessage(message))
}

/// Handle ConversationGetMessages command.
pub fn conversation_get_messages(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    conversation_id: String,
    message_ids: Vec<String>,
) -> Result<Output> {
    let messages = convert_result(p.conversations.get_messages_by_ids(
        &space,
        &conversation_id,
        &message_ids,
    ))?;
    Ok(Output::Messages(messages))
}

/// Handle ConversationFind command.
pub fn conversation_find(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    user_id: String,
    agent_id: String,
) -> Result<Output> {
    let record = convert_result(p.conversations.find_conversation(&space, &user_id, &agent_id))?;
    Ok(Output::MaybeConversation(record))
}

/// Handle ConversationList command.
pub fn conversation_list(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    filter: ConversationFilter,
) -> Result<Output> {
    Ok(Output::Conversations(convert_result(p.conversations.list(&space, &filter))?))
}

/// Handle ConversationCount command.
pub fn conversation_count(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    filter: ConversationFilter,
) -> Result<Output> {
    Ok(Output::Count(convert_result(p.conversations.count(&space, &filter))?))
}

/// Handle ConversationSearch command.
pub fn conversation_search(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    request: SearchConversations,
) -> Result<Output> {
    let hits = convert_result(p.conversations.search(&space, &request))?;
    Ok(Output::ConversationHits(hits))
}

/// Handle ConversationExport command.
pub fn conversation_export(
    p: &Arc<Primitives>,
    space: MemorySpaceId,
    filter: ConversationFilter,
    format: ExportFormat,
) -> Result<Output> {
    let text = convert_result(p.conversations.export(&space, &filter, format))?;
    Ok(Output::Text(text))
}
