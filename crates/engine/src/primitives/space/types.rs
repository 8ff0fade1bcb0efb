//! Memory space registry types

use cortex_core::{MemorySpaceId, Metadata, Millis};
use serde::{Deserialize, Serialize};

/// What a memory space is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    /// One user's memory
    Personal,
    /// Shared by a team of agents
    Team,
    /// Scoped to a project
    Project,
    Custom,
}

/// Lifecycle state; archived spaces reject writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceStatus {
    #[default]
    Active,
    Archived,
}

/// A member of a memory space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    /// Free-form kind, e.g. "agent", "user" or "tool"
    #[serde(rename = "type")]
    pub participant_type: String,
    pub joined_at: Millis,
}

/// A participant to add
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub id: String,
    #[serde(rename = "type")]
    pub participant_type: String,
}

impl NewParticipant {
    pub fn new(id: impl Into<String>, participant_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            participant_type: participant_type.into(),
        }
    }
}

/// Registry record of a memory space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySpace {
    pub memory_space_id: MemorySpaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub space_type: SpaceType,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub status: SpaceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub created_at: Millis,
    pub updated_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<Millis>,
}

impl MemorySpace {
    pub fn is_archived(&self) -> bool {
        self.status == SpaceStatus::Archived
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }
}

/// Input to `MemorySpaceRegistry::register`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterMemorySpace {
    pub memory_space_id: MemorySpaceId,
    #[serde(rename = "type")]
    pub space_type: SpaceType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub participants: Vec<NewParticipant>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl RegisterMemorySpace {
    pub fn new(memory_space_id: impl Into<MemorySpaceId>, space_type: SpaceType) -> Self {
        Self {
            memory_space_id: memory_space_id.into(),
            space_type,
            name: None,
            participants: Vec::new(),
            metadata: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn participant(mut self, id: impl Into<String>, participant_type: impl Into<String>) -> Self {
        self.participants.push(NewParticipant::new(id, participant_type));
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Changes applied by `MemorySpaceRegistry::update`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySpaceUpdate {
    pub name: Option<String>,
    /// Replacement metadata
    pub metadata: Option<Metadata>,
}

impl MemorySpaceUpdate {
    pub fn is_empty(&self) -> bool {
        self == &MemorySpaceUpdate::default()
    }
}

/// Filter for listing and counting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySpaceFilter {
    pub space_type: Option<SpaceType>,
    pub status: Option<SpaceStatus>,
    pub limit: Option<usize>,
}

impl MemorySpaceFilter {
    pub(crate) fn matches(&self, space: &MemorySpace) -> bool {
        self.space_type.map_or(true, |t| space.space_type == t)
            && self.status.map_or(true, |s| space.status == s)
    }
}

/// Record counts of one memory space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySpaceStats {
    pub memory_space_id: MemorySpaceId,
    pub conversations: usize,
    /// Messages across the space's conversations
    pub messages: usize,
    pub immutable_records: usize,
    pub mutable_entries: usize,
    pub memories: usize,
    pub facts: usize,
    pub contexts: usize,
    pub participants: usize,
}

impl MemorySpaceStats {
    /// Records across every layer (messages excluded)
    pub fn total_records(&self) -> usize {
        self.conversations
            + self.immutable_records
            + self.mutable_entries
            + self.memories
            + self.facts
            + self.contexts
    }
}

/// What a cascading space deletion removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub memory_space_id: MemorySpaceId,
    pub conversations: usize,
    pub immutable_records: usize,
    pub mutable_entries: usize,
    pub memories: usize,
    pub facts: usize,
    pub contexts: usize,
    /// Contexts in other spaces whose parent was deleted
    #[serde(default)]
    pub orphaned_contexts: Vec<String>,
}

impl CascadeReport {
    pub fn total_deleted(&self) -> usize {
        self.conversations
            + self.immutable_records
            + self.mutable_entries
            + self.memories
            + self.facts
            + self.contexts
    }
}
