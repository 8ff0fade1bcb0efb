//! Memory record types

use cortex_core::{JsonValue, MemorySpaceId, Metadata, Millis, Tags};
use serde::{Deserialize, Serialize};

use crate::primitives::conversation::MessageRole;
use crate::primitives::versioned::{VersionHistory, Versioned};
use crate::search::Boosted;

/// Default importance when the caller gives none
pub const DEFAULT_IMPORTANCE: u8 = 50;

/// Tag added to memories written through the streaming protocol
pub const STREAMING_TAG: &str = "streaming";

/// Tag marking a memory that is still being streamed
pub const PARTIAL_TAG: &str = "partial";

/// What kind of text a memory holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Verbatim text
    #[default]
    Raw,
    /// Summary of longer material
    Summarized,
    /// An extracted fact
    Fact,
}

/// Where a memory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    /// A conversation message
    Conversation,
    /// Written by the system
    #[default]
    System,
    /// Output of a tool
    Tool,
    /// Agent-to-agent message
    A2a,
    /// Produced by fact extraction
    FactExtraction,
}

/// Provenance of a memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySource {
    /// Kind of source
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// User involved, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display name of the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// When the source event happened
    pub timestamp: Millis,
}

/// Link to conversation messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRef {
    /// Conversation id
    pub conversation_id: String,
    /// Messages the memory was derived from
    #[serde(default)]
    pub message_ids: Vec<String>,
}

/// Link to an immutable record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutableRef {
    /// Record type
    pub record_type: String,
    /// Record id
    pub id: String,
    /// Version referenced, if pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// Link to a mutable entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutableRef {
    /// Namespace
    pub namespace: String,
    /// Key
    pub key: String,
    /// Value at the time the memory was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_value: Option<JsonValue>,
}

/// Link to a fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRef {
    /// Fact id
    pub fact_id: String,
    /// Fact version referenced, if pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// Versioned part of a memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Text
    pub content: String,
    /// Embedding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A stored memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Memory id, unique across spaces
    pub memory_id: String,
    /// Owning space
    pub memory_space_id: MemorySpaceId,
    /// Participant that wrote it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    /// Text
    pub content: String,
    /// Kind of text
    pub content_type: ContentType,
    /// Embedding, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Provenance
    pub source: MemorySource,
    /// Role of the message author, for conversation memories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_role: Option<MessageRole>,
    /// 0..=100
    pub importance: u8,
    /// Tags
    #[serde(default)]
    pub tags: Tags,
    /// Extra searchable text added by enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_content: Option<String>,
    /// Fact category, used for category boosting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_category: Option<String>,
    /// Source conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_ref: Option<ConversationRef>,
    /// Source immutable record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable_ref: Option<ImmutableRef>,
    /// Source mutable entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutable_ref: Option<MutableRef>,
    /// Source fact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_ref: Option<FactRef>,
    /// Still being streamed
    #[serde(default)]
    pub is_partial: bool,
    /// Tags added by `store_partial`, removed again on finalize
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub streaming_tags: Tags,
    /// Times read through `record_access`
    #[serde(default)]
    pub access_count: u64,
    /// Last `record_access`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<Millis>,
    /// Caller metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Creation time
    pub created_at: Millis,
    /// When the current version was written
    pub updated_at: Millis,
    /// Version and prior `{content, embedding}` values
    #[serde(flatten)]
    pub history: VersionHistory<MemorySnapshot>,
}

impl Versioned for MemoryRecord {
    type Snapshot = MemorySnapshot;

    fn history(&self) -> &VersionHistory<MemorySnapshot> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut VersionHistory<MemorySnapshot> {
        &mut self.history
    }

    fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            content: self.content.clone(),
            embedding: self.embedding.clone(),
        }
    }

    fn apply_snapshot(&mut self, data: &MemorySnapshot) {
        self.content = data.content.clone();
        self.embedding = data.embedding.clone();
    }

    fn created_at(&self) -> Millis {
        self.created_at
    }

    fn updated_at(&self) -> Millis {
        self.updated_at
    }

    fn set_updated_at(&mut self, t: Millis) {
        self.updated_at = t;
    }
}

impl Boosted for MemoryRecord {
    fn is_user_authored(&self) -> bool {
        self.message_role == Some(MessageRole::User)
    }

    fn category(&self) -> Option<&str> {
        self.fact_category.as_deref()
    }

    fn is_enriched(&self) -> bool {
        self.enriched_content
            .as_deref()
            .map_or(false, |s| !s.trim().is_empty())
    }
}

/// Input to `MemoryStore::store`
///
/// ```
/// use cortex_engine::{SourceType, StoreMemory};
///
/// let input = StoreMemory::new("user prefers dark mode")
///     .source(SourceType::Conversation)
///     .importance(80)
///     .tag("preferences");
/// assert_eq!(input.importance, Some(80));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreMemory {
    pub memory_id: Option<String>,
    pub content: String,
    pub content_type: ContentType,
    pub embedding: Option<Vec<f32>>,
    pub source_type: SourceType,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub participant_id: Option<String>,
    pub message_role: Option<MessageRole>,
    pub importance: Option<u8>,
    pub tags: Tags,
    pub enriched_content: Option<String>,
    pub fact_category: Option<String>,
    pub conversation_ref: Option<ConversationRef>,
    pub immutable_ref: Option<ImmutableRef>,
    pub mutable_ref: Option<MutableRef>,
    pub fact_ref: Option<FactRef>,
    pub metadata: Option<Metadata>,
}

impl StoreMemory {
    /// A system memory with default importance
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.memory_id = Some(id.into());
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn source(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    pub fn role(mut self, role: MessageRole) -> Self {
        self.message_role = Some(role);
        self
    }

    pub fn importance(mut self, importance: u8) -> Self {
        self.importance = Some(importance);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn enriched(mut self, text: impl Into<String>) -> Self {
        self.enriched_content = Some(text.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.fact_category = Some(category.into());
        self
    }

    pub fn conversation_ref(mut self, conversation_id: impl Into<String>, message_ids: Vec<String>) -> Self {
        self.conversation_ref = Some(ConversationRef {
            conversation_id: conversation_id.into(),
            message_ids,
        });
        self
    }

    pub fn immutable_ref(mut self, record_type: impl Into<String>, id: impl Into<String>, version: Option<u64>) -> Self {
        self.immutable_ref = Some(ImmutableRef {
            record_type: record_type.into(),
            id: id.into(),
            version,
        });
        self
    }

    pub fn mutable_ref(mut self, namespace: impl Into<String>, key: impl Into<String>, snapshot_value: Option<JsonValue>) -> Self {
        self.mutable_ref = Some(MutableRef {
            namespace: namespace.into(),
            key: key.into(),
            snapshot_value,
        });
        self
    }

    pub fn fact_ref(mut self, fact_id: impl Into<String>, version: Option<u64>) -> Self {
        self.fact_ref = Some(FactRef {
            fact_id: fact_id.into(),
            version,
        });
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Changes applied by `MemoryStore::update`; None leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryUpdate {
    /// New text
    pub content: Option<String>,
    /// New embedding
    pub embedding: Option<Vec<f32>>,
    /// New importance
    pub importance: Option<u8>,
    /// Replacement tag set
    pub tags: Option<Tags>,
    /// New enriched content
    pub enriched_content: Option<String>,
    /// New fact category
    pub fact_category: Option<String>,
    /// Replacement metadata
    pub metadata: Option<Metadata>,
}

impl MemoryUpdate {
    /// True if nothing would change
    pub fn is_empty(&self) -> bool {
        self == &MemoryUpdate::default()
    }
}

/// Filter for listing, counting and bulk deletion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryFilter {
    /// Only this content type
    pub content_type: Option<ContentType>,
    /// Only this source type
    pub source_type: Option<SourceType>,
    /// Only memories of this user
    pub user_id: Option<String>,
    /// Only memories written by this participant
    pub participant_id: Option<String>,
    /// Only memories carrying every one of these tags
    pub tags: Tags,
    /// Only memories at least this important
    pub min_importance: Option<u8>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl MemoryFilter {
    pub(crate) fn matches(&self, record: &MemoryRecord) -> bool {
        self.content_type.map_or(true, |t| record.content_type == t)
            && self
                .source_type
                .map_or(true, |t| record.source.source_type == t)
            && self
                .user_id
                .as_ref()
                .map_or(true, |u| record.source.user_id.as_ref() == Some(u))
            && self
                .participant_id
                .as_ref()
                .map_or(true, |p| record.participant_id.as_ref() == Some(p))
            && self.tags.iter().all(|t| record.tags.contains(t))
            && self.min_importance.map_or(true, |m| record.importance >= m)
    }
}

/// Options for `MemoryStore::search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySearch {
    /// Keyword query; used when no embedding is given
    pub query: String,
    /// Query embedding; switches to cosine ranking
    pub embedding: Option<Vec<f32>>,
    /// Candidate filter (its `limit` is ignored)
    pub filter: MemoryFilter,
    /// Category of the query, for category boosting
    pub query_category: Option<String>,
    /// Drop results scoring below this, after boosting
    pub min_score: Option<f64>,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Also rank memories that are still being streamed
    pub include_partial: bool,
}

impl MemorySearch {
    /// Keyword search
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Similarity search
    pub fn by_embedding(embedding: Vec<f32>) -> Self {
        Self {
            embedding: Some(embedding),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: MemoryFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn query_category(mut self, category: impl Into<String>) -> Self {
        self.query_category = Some(category.into());
        self
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn include_partial(mut self, yes: bool) -> Self {
        self.include_partial = yes;
        self
    }
}

/// A ranked memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySearchHit {
    /// The memory
    pub memory: MemoryRecord,
    /// Boosted score
    pub score: f64,
}
