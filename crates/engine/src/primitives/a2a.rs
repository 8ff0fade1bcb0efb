//! Agent-to-agent messaging
//!
//! A message between two memory spaces is stored twice as a vector memory:
//! once in the sender's space (tagged `a2a`, `sent`) and once in the
//! receiver's (tagged `a2a`, `received`). With conversation tracking the
//! message is also appended to the agent-agent conversation of the pair,
//! which is created on first use under a deterministic id.

use std::sync::Arc;

use cortex_core::{generate_id, CortexError, CortexResult, MemorySpaceId, Metadata, Millis};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::primitives::conversation::{
    ConversationRecord, ConversationStore, CreateConversation, MessageRole, NewMessage,
};
use crate::primitives::vector::{MemoryStore, SourceType, StoreMemory};
use crate::validation;

/// Tag on every agent-to-agent memory
pub const A2A_TAG: &str = "a2a";
/// Tag on the sender's copy
pub const SENT_TAG: &str = "sent";
/// Tag on the receiver's copy
pub const RECEIVED_TAG: &str = "received";

fn default_track() -> bool {
    true
}

/// Options for `A2A::send` and `A2A::broadcast`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2ASendOptions {
    /// Importance of both memories
    #[serde(default)]
    pub importance: Option<u8>,
    /// Append to the pair's agent-agent conversation
    #[serde(default = "default_track")]
    pub track_conversation: bool,
    /// User on whose behalf the agents talk
    #[serde(default)]
    pub user_id: Option<String>,
    /// Extra metadata for both memories
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl Default for A2ASendOptions {
    fn default() -> Self {
        Self {
            importance: None,
            track_conversation: true,
            user_id: None,
            metadata: None,
        }
    }
}

/// Outcome of one send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct A2ASendResult {
    pub message_id: String,
    pub from: MemorySpaceId,
    pub to: MemorySpaceId,
    pub sender_memory_id: String,
    pub receiver_memory_id: String,
    /// Set when the conversation was tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub sent_at: Millis,
}

/// Outcome of a broadcast, one send per recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub from: MemorySpaceId,
    pub results: Vec<A2ASendResult>,
}

impl BroadcastResult {
    pub fn memories_created(&self) -> usize {
        self.results.len() * 2
    }

    pub fn conversations_tracked(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.conversation_id.is_some())
            .count()
    }
}

/// Addressing shared by both copies of a message
struct Envelope<'a> {
    from: &'a MemorySpaceId,
    to: &'a MemorySpaceId,
    message_id: &'a str,
    conversation_id: Option<&'a str>,
}

/// Agent-to-agent messaging facade
#[derive(Clone)]
pub struct A2A {
    db: Arc<Database>,
    memories: MemoryStore,
    conversations: ConversationStore,
}

/// Conversation id shared by a pair of spaces, independent of direction
pub fn conversation_id_for(a: &MemorySpaceId, b: &MemorySpaceId) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("a2a-{}-{}-{}", first.as_str().len(), first, second)
}

impl A2A {
    /// Create a new messaging facade
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            memories: MemoryStore::new(db.clone()),
            conversations: ConversationStore::new(db.clone()),
            db,
        }
    }

    fn check_pair(&self, from: &MemorySpaceId, to: &MemorySpaceId) -> CortexResult<()> {
        let limits = self.db.limits();
        validation::validate_space(from, &limits)?;
        validation::validate_space(to, &limits)?;
        if from == to {
            return Err(CortexError::invalid_input(format!(
                "memory space {} cannot message itself",
                from
            )));
        }
        self.db.guard_write(from)?;
        self.db.guard_write(to)
    }

    fn memory(&self, message: &str, direction: &str, envelope: &Envelope<'_>, options: &A2ASendOptions) -> StoreMemory {
        let mut metadata = options.metadata.clone().unwrap_or_default();
        metadata.insert("direction".into(), direction.into());
        metadata.insert("from_memory_space".into(), envelope.from.as_str().into());
        metadata.insert("to_memory_space".into(), envelope.to.as_str().into());
        metadata.insert("message_id".into(), envelope.message_id.into());

        let mut input = StoreMemory::new(message)
            .source(SourceType::A2a)
            .role(MessageRole::Agent)
            .tag(A2A_TAG)
            .tag(direction)
            .metadata(metadata);
        if let Some(importance) = options.importance {
            input = input.importance(importance);
        }
        if let Some(user_id) = &options.user_id {
            input = input.user(user_id.clone());
        }
        if let Some(conversation_id) = envelope.conversation_id {
            input = input.conversation_ref(conversation_id, vec![envelope.message_id.to_string()]);
        }
        input
    }

    /// The pair's conversation, created if it does not exist yet
    fn ensure_conversation(&self, from: &MemorySpaceId, to: &MemorySpaceId) -> CortexResult<String> {
        let id = conversation_id_for(from, to);
        if self.db.tables.conversations.locate(&id).is_some() {
            return Ok(id);
        }
        let (owner, other) = if from <= to { (from, to) } else { (to, from) };
        let input = CreateConversation::agent_agent(owner.clone(), vec![owner.clone(), other.clone()])
            .with_id(id.clone());
        match self.conversations.create(input) {
            Ok(_) => {
                tracing::debug!(
                    target: "cortex::a2a",
                    conversation_id = %id,
                    "agent-agent conversation started"
                );
                Ok(id)
            }
            Err(CortexError::AlreadyExists { .. }) => Ok(id),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Send a message from one memory space to another
    ///
    /// Writes the sender and receiver memories and, when tracking, appends
    /// the message to the pair's conversation. If the receiver memory cannot
    /// be written the sender memory is removed again.
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` on an empty message or when `from == to`
    /// - `PERMISSION_DENIED` if either space is archived
    pub fn send(
        &self,
        from: &MemorySpaceId,
        to: &MemorySpaceId,
        message: &str,
        options: &A2ASendOptions,
    ) -> CortexResult<A2ASendResult> {
        self.check_pair(from, to)?;
        let limits = self.db.limits();
        validation::validate_content("message", message, limits.max_message_bytes)?;
        if let Some(importance) = options.importance {
            validation::validate_percent("importance", importance)?;
        }

        let sent_at = self.db.now();
        let message_id = generate_id("a2a", sent_at);
        let conversation_id = if options.track_conversation {
            let id = self.ensure_conversation(from, to)?;
            let mut entry = NewMessage::agent(message).with_id(message_id.clone());
            entry.participant_id = Some(from.as_str().to_string());
            self.conversations.add_message(from, &id, entry)?;
            Some(id)
        } else {
            None
        };

        let envelope = Envelope {
            from,
            to,
            message_id: &message_id,
            conversation_id: conversation_id.as_deref(),
        };
        let sender = self
            .memories
            .store(from, self.memory(message, SENT_TAG, &envelope, options))?;
        let receiver = match self
            .memories
            .store(to, self.memory(message, RECEIVED_TAG, &envelope, options))
        {
            Ok(receiver) => receiver,
            Err(e) => {
                if let Err(undo) = self.memories.delete(from, &sender.memory_id) {
                    tracing::warn!(
                        target: "cortex::a2a",
                        memory_space = %from,
                        memory_id = %sender.memory_id,
                        error = %undo,
                        "could not remove sender memory after failed send"
                    );
                }
                return Err(e);
            }
        };

        tracing::debug!(
            target: "cortex::a2a",
            from = %from,
            to = %to,
            message_id = %message_id,
            tracked = conversation_id.is_some(),
            "a2a message sent"
        );
        Ok(A2ASendResult {
            message_id,
            from: from.clone(),
            to: to.clone(),
            sender_memory_id: sender.memory_id,
            receiver_memory_id: receiver.memory_id,
            conversation_id,
            sent_at,
        })
    }

    /// Send the same message to several recipients, one send each
    ///
    /// Every recipient is checked before the first send. Sends then run in
    /// order and stop at the first failure; earlier sends are kept.
    ///
    /// # Errors
    ///
    /// `VALIDATION_ERROR` if `recipients` is empty, repeats a space or
    /// includes the sender.
    pub fn broadcast(
        &self,
        from: &MemorySpaceId,
        recipients: &[MemorySpaceId],
        message: &str,
        options: &A2ASendOptions,
    ) -> CortexResult<BroadcastResult> {
        if recipients.is_empty() {
            return Err(CortexError::invalid_input("broadcast needs at least one recipient"));
        }
        let limits = self.db.limits();
        if recipients.len() > limits.max_batch_ops {
            return Err(CortexError::invalid_input(format!(
                "broadcast has {} recipients, limit is {}",
                recipients.len(),
                limits.max_batch_ops
            )));
        }
        let mut seen: FxHashSet<&MemorySpaceId> = FxHashSet::default();
        for to in recipients {
            if !seen.insert(to) {
                return Err(CortexError::invalid_input(format!(
                    "recipient {} is listed twice",
                    to
                )));
            }
            self.check_pair(from, to)?;
        }

        let mut results = Vec::with_capacity(recipients.len());
        for to in recipients {
            results.push(self.send(from, to, message, options)?);
        }

        tracing::debug!(
            target: "cortex::a2a",
            from = %from,
            recipients = results.len(),
            "a2a broadcast sent"
        );
        Ok(BroadcastResult {
            from: from.clone(),
            results,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The tracked conversation between two spaces, if any
    pub fn get_conversation(&self, a: &MemorySpaceId, b: &MemorySpaceId) -> CortexResult<Option<ConversationRecord>> {
        Ok(self
            .db
            .tables
            .conversations
            .find(&conversation_id_for(a, b))
            .map(|(_, record)| record))
    }
}
