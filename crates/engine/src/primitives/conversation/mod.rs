//! Append-only conversation log
//!
//! Conversation ids are unique across every memory space. Messages are only
//! ever appended: nothing rewrites, removes or reorders a message once it is
//! stored, and `message_count` always equals the number of messages.
//!
//! Agent-agent conversations are owned by one space but readable and
//! appendable by every space listed in their participants. `list`, `count`,
//! `search` and `export` include them for every participant; deletes and
//! `message_total` only ever touch the owner's conversations.
//!
//! Creating a conversation whose id already exists fails with
//! `ALREADY_EXISTS`; it never returns the existing record.

mod search;
mod types;

pub use types::{
    ConversationFilter, ConversationRecord, ConversationSearchHit, ConversationType,
    CreateConversation, ExportFormat, HistoryOptions, HistoryPage, Message, MessageRole,
    NewMessage, Participants, SearchConversations, SortOrder,
};

use std::sync::Arc;

use cortex_core::{generate_id, CortexError, CortexResult, EntityRef, JsonValue, MemorySpaceId, Scope};
use cortex_storage::StorageError;

use crate::database::Database;
use crate::search::TextMatcher;
use crate::validation;
use search::{rank, score_conversation, ConversationScoring};
pub(crate) use types::csv_field;

/// Conversation log
#[derive(Clone)]
pub struct ConversationStore {
    db: Arc<Database>,
}

impl ConversationStore {
    /// Create a new conversation store facade
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record and owner if `space` may see it
    fn visible(&self, space: &MemorySpaceId, conversation_id: &str) -> Option<ConversationRecord> {
        let (_, record) = self.db.tables.conversations.find(&conversation_id.to_string())?;
        let allowed = &record.memory_space_id == space
            || (record.conversation_type == ConversationType::AgentAgent
                && record.participants.includes_space(space));
        allowed.then_some(record)
    }

    /// Every conversation `space` may read that passes `pred`
    fn readable(
        &self,
        space: &MemorySpaceId,
        mut pred: impl FnMut(&ConversationRecord) -> bool,
    ) -> Vec<ConversationRecord> {
        let own = Scope::from(space);
        self.db
            .tables
            .conversations
            .scan_all(|scope, r| {
                let allowed = scope == &own
                    || (r.conversation_type == ConversationType::AgentAgent
                        && r.participants.includes_space(space));
                allowed && pred(r)
            })
            .into_iter()
            .map(|(_, r)| r)
            .collect()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a conversation
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` if the participants do not fit the type
    /// - `ALREADY_EXISTS` if the id is taken in any space
    pub fn create(&self, input: CreateConversation) -> CortexResult<ConversationRecord> {
        let space = input.memory_space_id.clone();
        self.db.guard_write(&space)?;
        let limits = self.db.limits();
        validation::validate_space(&space, &limits)?;
        if let Some(id) = &input.conversation_id {
            validation::validate_id("conversation_id", id, &limits)?;
        }
        input.participants.validate(input.conversation_type)?;
        if let Some(metadata) = &input.metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }

        let now = self.db.now();
        let conversation_id = input
            .conversation_id
            .unwrap_or_else(|| generate_id("conv", now));
        let entity = EntityRef::conversation(&space, &conversation_id);
        let record = ConversationRecord {
            conversation_id: conversation_id.clone(),
            memory_space_id: space.clone(),
            participant_id: input.participant_id,
            conversation_type: input.conversation_type,
            participants: input.participants,
            messages: Vec::new(),
            message_count: 0,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        };

        let scope = Scope::from(&space);
        self.db.tables.conversations.with_shard_mut(&scope, |shard| {
            if shard.contains(&conversation_id) {
                return Err(CortexError::already_exists(entity.clone()));
            }
            match shard.insert(conversation_id.clone(), record.clone()) {
                Ok(_) => Ok(()),
                Err(StorageError::KeyOwnedElsewhere { .. }) => {
                    Err(CortexError::already_exists(entity.clone()))
                }
            }
        })?;

        tracing::debug!(
            target: "cortex::conversation",
            memory_space = %space,
            conversation_id = %conversation_id,
            conversation_type = ?record.conversation_type,
            "conversation created"
        );
        Ok(record)
    }

    /// Append a message
    ///
    /// `space` must own the conversation, or be a participant of an
    /// agent-agent conversation. Returns the updated conversation.
    pub fn add_message(
        &self,
        space: &MemorySpaceId,
        conversation_id: &str,
        message: NewMessage,
    ) -> CortexResult<ConversationRecord> {
        self.db.guard_write(space)?;
        let limits = self.db.limits();
        validation::validate_content("content", &message.content, limits.max_message_bytes)?;
        if let Some(id) = &message.id {
            validation::validate_id("message_id", id, &limits)?;
        }

        let key = conversation_id.to_string();
        let owner = self
            .db
            .tables
            .conversations
            .find(&key)
            .map(|(_, r)| r)
            .ok_or_else(|| CortexError::not_found(EntityRef::conversation(space, conversation_id)))?;
        let permitted = &owner.memory_space_id == space
            || (owner.conversation_type == ConversationType::AgentAgent
                && owner.participants.includes_space(space));
        if !permitted {
            return Err(CortexError::permission_denied(format!(
                "conversation {} belongs to memory space {}",
                conversation_id, owner.memory_space_id
            )));
        }
        let owner_space = owner.memory_space_id;
        if &owner_space != space {
            self.db.guard_write(&owner_space)?;
        }

        let scope = Scope::from(&owner_space);
        let (updated, message_id) = self.db.tables.conversations.with_shard_mut(&scope, |shard| {
            // Timestamps follow append order
            let now = self.db.now();
            let message_id = message.id.unwrap_or_else(|| generate_id("msg", now));
            let new_message = Message {
                id: message_id.clone(),
                role: message.role,
                content: message.content,
                timestamp: now,
                participant_id: message.participant_id,
                metadata: message.metadata,
            };
            let current = shard
                .get(&key)
                .ok_or_else(|| CortexError::not_found(EntityRef::conversation(&owner_space, &key)))?;
            if current.message(&message_id).is_some() {
                return Err(CortexError::already_exists(EntityRef::message(&key, &message_id)));
            }
            let updated = shard
                .update(&key, |r| {
                    r.messages.push(new_message);
                    r.message_count = r.messages.len();
                    r.updated_at = now;
                    r.clone()
                })
                .ok_or_else(|| CortexError::not_found(EntityRef::conversation(&owner_space, &key)))?;
            Ok((updated, message_id))
        })?;

        tracing::debug!(
            target: "cortex::conversation",
            memory_space = %owner_space,
            conversation_id,
            message_id = %message_id,
            message_count = updated.message_count,
            "message appended"
        );
        Ok(updated)
    }

    /// Hard-delete a conversation and its messages
    pub fn delete(&self, space: &MemorySpaceId, conversation_id: &str) -> CortexResult<ConversationRecord> {
        self.db.guard_write(space)?;
        let key = conversation_id.to_string();
        match self.db.tables.conversations.locate(&key) {
            None => Err(CortexError::not_found(EntityRef::conversation(space, conversation_id))),
            Some(owner) if owner.space() != Some(space) => Err(CortexError::permission_denied(format!(
                "conversation {} belongs to memory space {}",
                conversation_id, owner
            ))),
            Some(owner) => {
                let removed = self
                    .db
                    .tables
                    .conversations
                    .with_shard_mut(&owner, |shard| shard.remove(&key))
                    .ok_or_else(|| CortexError::not_found(EntityRef::conversation(space, conversation_id)))?;
                tracing::debug!(
                    target: "cortex::conversation",
                    memory_space = %space,
                    conversation_id,
                    "conversation deleted"
                );
                Ok(removed)
            }
        }
    }

    /// Hard-delete every conversation of a space matching a filter
    ///
    /// `filter.limit` is ignored. Returns the number deleted.
    pub fn delete_many(&self, space: &MemorySpaceId, filter: &ConversationFilter) -> CortexResult<usize> {
        self.db.guard_write(space)?;
        let removed = self
            .db
            .tables
            .conversations
            .with_shard_mut(&Scope::from(space), |shard| {
                shard.remove_where(|_, r| filter.matches(r))
            })
            .len();
        tracing::debug!(
            target: "cortex::conversation",
            memory_space = %space,
            removed,
            "conversations deleted"
        );
        Ok(removed)
    }

    /// Remove every conversation in every space
    ///
    /// Only permitted in Dev and Test environments.
    pub fn purge_all(&self) -> CortexResult<usize> {
        self.db.require_destructive("conversations.purge_all")?;
        let removed = self.db.tables.conversations.clear();
        tracing::info!(target: "cortex::conversation", removed, "all conversations purged");
        Ok(removed)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a conversation
    ///
    /// Returns None if it does not exist or `space` may not see it.
    pub fn get(&self, space: &MemorySpaceId, conversation_id: &str) -> CortexResult<Option<ConversationRecord>> {
        Ok(self.visible(space, conversation_id))
    }

    /// Page through a conversation's messages
    ///
    /// Filters (roles, time range) apply first, then ordering, then
    /// `offset` and `limit`. Returns None if the conversation is not visible.
    pub fn get_history(
        &self,
        space: &MemorySpaceId,
        conversation_id: &str,
        options: &HistoryOptions,
    ) -> CortexResult<Option<HistoryPage>> {
        let Some(record) = self.visible(space, conversation_id) else {
            return Ok(None);
        };

        let mut messages: Vec<Message> = record
            .messages
            .into_iter()
            .filter(|m| options.roles.as_ref().map_or(true, |roles| roles.contains(&m.role)))
            .filter(|m| options.since.map_or(true, |t| m.timestamp >= t))
            .filter(|m| options.until.map_or(true, |t| m.timestamp <= t))
            .collect();
        if options.order == SortOrder::Desc {
            messages.reverse();
        }

        let total = messages.len();
        let page: Vec<Message> = messages
            .into_iter()
            .skip(options.offset)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();
        let has_more = options.offset.saturating_add(page.len()) < total;
        Ok(Some(HistoryPage {
            messages: page,
            total,
            has_more,
        }))
    }

    /// A single message
    pub fn get_message(
        &self,
        space: &MemorySpaceId,
        conversation_id: &str,
        message_id: &str,
    ) -> CortexResult<Option<Message>> {
        Ok(self
            .visible(space, conversation_id)
            .and_then(|r| r.message(message_id).cloned()))
    }

    /// Messages by id, in the order requested; unknown ids are skipped
    ///
    /// Fails with `NOT_FOUND` if the conversation is not visible.
    pub fn get_messages_by_ids(
        &self,
        space: &MemorySpaceId,
        conversation_id: &str,
        message_ids: &[String],
    ) -> CortexResult<Vec<Message>> {
        let record = self
            .visible(space, conversation_id)
            .ok_or_else(|| CortexError::not_found(EntityRef::conversation(space, conversation_id)))?;
        Ok(message_ids
            .iter()
            .filter_map(|id| record.message(id).cloned())
            .collect())
    }

    /// The user-agent conversation between a user and an agent, if any
    ///
    /// When several exist the most recently updated wins.
    pub fn find_conversation(
        &self,
        space: &MemorySpaceId,
        user_id: &str,
        agent_id: &str,
    ) -> CortexResult<Option<ConversationRecord>> {
        let found = self
            .db
            .tables
            .conversations
            .scan(&Scope::from(space), |_, r| {
                r.conversation_type == ConversationType::UserAgent
                    && r.participants.user_id.as_deref() == Some(user_id)
                    && r.participants.agent_id.as_deref() == Some(agent_id)
            })
            .into_iter()
            .max_by_key(|r| r.updated_at);
        Ok(found)
    }

    /// Conversations a space can read, most recently updated first
    pub fn list(&self, space: &MemorySpaceId, filter: &ConversationFilter) -> CortexResult<Vec<ConversationRecord>> {
        let mut records = self.readable(space, |r| filter.matches(r));
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.conversation_id.cmp(&b.conversation_id))
        });
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Number of conversations a space can read matching a filter
    pub fn count(&self, space: &MemorySpaceId, filter: &ConversationFilter) -> CortexResult<usize> {
        Ok(self.readable(space, |r| filter.matches(r)).len())
    }

    /// Total messages across a space's conversations
    pub fn message_total(&self, space: &MemorySpaceId) -> usize {
        self.db
            .tables
            .conversations
            .with_shard(&Scope::from(space), |shard| {
                shard.iter().map(|(_, r)| r.message_count).sum()
            })
    }

    /// Search message content (and optionally metadata)
    ///
    /// Ranked by the fraction of matching messages, with a boost for a
    /// metadata hit; ties go to the most recently updated conversation.
    pub fn search(
        &self,
        space: &MemorySpaceId,
        request: &SearchConversations,
    ) -> CortexResult<Vec<ConversationSearchHit>> {
        if request.query.trim().is_empty() {
            return Err(CortexError::invalid_input("query must not be empty"));
        }
        let config = self.db.search_config();
        let scoring = ConversationScoring {
            metadata_boost: config.metadata_boost,
            highlight_radius: config.highlight_radius,
        };
        let matcher = TextMatcher::new(&request.query, request.mode);

        let candidates = self.readable(space, |r| {
            request
                .user_id
                .as_ref()
                .map_or(true, |u| r.participants.user_id.as_ref() == Some(u))
        });
        let mut hits: Vec<ConversationSearchHit> = candidates
            .iter()
            .filter_map(|r| score_conversation(r, &matcher, request.search_metadata, scoring))
            .collect();
        rank(&mut hits);
        hits.truncate(request.limit.unwrap_or(config.default_limit));

        tracing::trace!(
            target: "cortex::conversation",
            memory_space = %space,
            scanned = candidates.len(),
            hits = hits.len(),
            "conversation search"
        );
        Ok(hits)
    }

    /// Export a space's conversations
    pub fn export(
        &self,
        space: &MemorySpaceId,
        filter: &ConversationFilter,
        format: ExportFormat,
    ) -> CortexResult<String> {
        let records = self.list(space, filter)?;
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&records)?),
            ExportFormat::Csv => {
                let mut out = String::from(
                    "conversation_id,memory_space_id,type,user_id,agent_id,message_count,created_at,updated_at\n",
                );
                for r in &records {
                    let kind = match r.conversation_type {
                        ConversationType::UserAgent => "user-agent",
                        ConversationType::AgentAgent => "agent-agent",
                    };
                    let row = [
                        csv_field(&r.conversation_id),
                        csv_field(r.memory_space_id.as_str()),
                        kind.to_string(),
                        csv_field(r.participants.user_id.as_deref().unwrap_or("")),
                        csv_field(r.participants.agent_id.as_deref().unwrap_or("")),
                        r.message_count.to_string(),
                        r.created_at.to_string(),
                        r.updated_at.to_string(),
                    ];
                    out.push_str(&row.join(","));
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }
}
