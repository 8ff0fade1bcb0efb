//! Conversation records and request types

use cortex_core::{CortexError, CortexResult, MemorySpaceId, Metadata, Millis};
use serde::{Deserialize, Serialize};

use crate::search::MatchMode;

/// Who the conversation is between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversationType {
    /// A user talking to an agent
    UserAgent,
    /// Agents in different memory spaces talking to each other
    AgentAgent,
}

/// Parties to a conversation
///
/// Which fields are required depends on the `ConversationType`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Participants {
    /// User side of a user-agent conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Agent side of a user-agent conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Hive-mode participant writing on behalf of the space
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    /// Spaces taking part in an agent-agent conversation
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub memory_space_ids: Vec<MemorySpaceId>,
}

impl Participants {
    /// Participants of a user-agent conversation
    pub fn user_agent(user_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }

    /// Participants of an agent-agent conversation
    pub fn agent_agent(memory_space_ids: Vec<MemorySpaceId>) -> Self {
        Self {
            memory_space_ids,
            ..Self::default()
        }
    }

    /// Check the shape required by `conversation_type`
    pub fn validate(&self, conversation_type: ConversationType) -> CortexResult<()> {
        let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());
        match conversation_type {
            ConversationType::UserAgent => {
                if !present(&self.user_id) || !present(&self.agent_id) {
                    return Err(CortexError::invalid_input(
                        "user-agent conversations require user_id and agent_id",
                    ));
                }
            }
            ConversationType::AgentAgent => {
                let mut distinct: Vec<&MemorySpaceId> = self.memory_space_ids.iter().collect();
                distinct.sort();
                distinct.dedup();
                if distinct.len() < 2 {
                    return Err(CortexError::invalid_input(
                        "agent-agent conversations require at least 2 distinct memory spaces",
                    ));
                }
            }
        }
        Ok(())
    }

    /// True if `space` is one of the agent-agent participants
    pub fn includes_space(&self, space: &MemorySpaceId) -> bool {
        self.memory_space_ids.iter().any(|s| s == space)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End user
    User,
    /// Agent
    Agent,
    /// System prompt or notice
    System,
}

impl MessageRole {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Agent => "agent",
            MessageRole::System => "system",
        }
    }
}

/// A message in a conversation; never modified after it is appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id, unique within the conversation
    pub id: String,
    /// Author
    pub role: MessageRole,
    /// Text
    pub content: String,
    /// When it was appended
    pub timestamp: Millis,
    /// Participant that wrote it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    /// Caller metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Input to `ConversationStore::add_message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Explicit id, generated if absent
    #[serde(default)]
    pub id: Option<String>,
    /// Author
    pub role: MessageRole,
    /// Text
    pub content: String,
    /// Participant that wrote it
    #[serde(default)]
    pub participant_id: Option<String>,
    /// Caller metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl NewMessage {
    /// A message with the given role
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            participant_id: None,
            metadata: None,
        }
    }

    /// A user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// An agent message
    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Agent, content)
    }

    /// A system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Use an explicit message id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Record the participant that wrote it
    pub fn with_participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A stored conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Conversation id, unique across spaces
    pub conversation_id: String,
    /// Owning space
    pub memory_space_id: MemorySpaceId,
    /// Participant that created it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    /// Who the conversation is between
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    /// Parties
    pub participants: Participants,
    /// Append-only message log
    pub messages: Vec<Message>,
    /// Always equal to `messages.len()`
    pub message_count: usize,
    /// Caller metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Creation time
    pub created_at: Millis,
    /// Time of the last append
    pub updated_at: Millis,
}

impl ConversationRecord {
    /// Most recent message
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Message by id
    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }
}

/// Input to `ConversationStore::create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConversation {
    /// Explicit id, generated if absent
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Owning space
    pub memory_space_id: MemorySpaceId,
    /// Participant creating it
    #[serde(default)]
    pub participant_id: Option<String>,
    /// Who the conversation is between
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    /// Parties
    pub participants: Participants,
    /// Caller metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl CreateConversation {
    /// A user-agent conversation
    pub fn user_agent(
        memory_space_id: MemorySpaceId,
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: None,
            memory_space_id,
            participant_id: None,
            conversation_type: ConversationType::UserAgent,
            participants: Participants::user_agent(user_id, agent_id),
            metadata: None,
        }
    }

    /// An agent-agent conversation
    pub fn agent_agent(memory_space_id: MemorySpaceId, spaces: Vec<MemorySpaceId>) -> Self {
        Self {
            conversation_id: None,
            memory_space_id,
            participant_id: None,
            conversation_type: ConversationType::AgentAgent,
            participants: Participants::agent_agent(spaces),
            metadata: None,
        }
    }

    /// Use an explicit conversation id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Direction of a history page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first (insertion order)
    #[default]
    Asc,
    /// Newest first
    Desc,
}

/// Options for `ConversationStore::get_history`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Messages to skip after filtering and ordering
    pub offset: usize,
    /// Page size; all remaining messages if absent
    pub limit: Option<usize>,
    /// Chronological direction
    pub order: SortOrder,
    /// Only these roles
    pub roles: Option<Vec<MessageRole>>,
    /// Only messages at or after this time
    pub since: Option<Millis>,
    /// Only messages at or before this time
    pub until: Option<Millis>,
}

/// One page of conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Messages in the requested order
    pub messages: Vec<Message>,
    /// Messages matching the filters, before paging
    pub total: usize,
    /// True if more messages follow this page
    pub has_more: bool,
}

/// Filter for listing, counting and bulk deletion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationFilter {
    /// Only conversations of this type
    #[serde(rename = "type")]
    pub conversation_type: Option<ConversationType>,
    /// Only conversations with this user
    pub user_id: Option<String>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl ConversationFilter {
    pub(crate) fn matches(&self, record: &ConversationRecord) -> bool {
        self.conversation_type
            .map_or(true, |t| record.conversation_type == t)
            && self
                .user_id
                .as_ref()
                .map_or(true, |u| record.participants.user_id.as_ref() == Some(u))
    }
}

/// Options for `ConversationStore::search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConversations {
    /// Text to look for
    pub query: String,
    /// How to match
    #[serde(default)]
    pub mode: MatchMode,
    /// Also match conversation metadata
    #[serde(default)]
    pub search_metadata: bool,
    /// Only conversations with this user
    #[serde(default)]
    pub user_id: Option<String>,
    /// Maximum number of results
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchConversations {
    /// Case-insensitive substring search
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: MatchMode::default(),
            search_metadata: false,
            user_id: None,
            limit: None,
        }
    }

    /// Use a different match mode
    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Also match conversation metadata
    pub fn search_metadata(mut self, yes: bool) -> Self {
        self.search_metadata = yes;
        self
    }

    /// Cap the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A ranked conversation search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSearchHit {
    /// The conversation
    pub conversation: ConversationRecord,
    /// Messages that matched, in insertion order
    pub matched_messages: Vec<Message>,
    /// Context window around the first match of each matched message
    pub highlights: Vec<String>,
    /// `matched / total` plus the metadata boost
    pub score: f64,
    /// True if the conversation metadata matched
    pub metadata_match: bool,
}

/// Export encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array of records
    #[default]
    Json,
    /// One row per record
    Csv,
}

/// Quote a CSV field when it needs it
pub(crate) fn csv_field(value: &str) -> String {
    if value.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
