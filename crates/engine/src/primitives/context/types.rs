//! Context record types

use cortex_core::{JsonValue, MemorySpaceId, Metadata, Millis};
use serde::{Deserialize, Serialize};

use crate::primitives::versioned::{VersionHistory, Versioned};

/// Workflow state of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
    Blocked,
}

/// Permission for another memory space to attach children to a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedAccess {
    /// Space receiving access
    pub memory_space_id: MemorySpaceId,
    /// Free-form access scope, e.g. "read-only" or "collaborate"
    pub scope: String,
    /// When access was granted
    pub granted_at: Millis,
}

/// Versioned part of a context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub status: ContextStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A node in the context tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Context id, unique across spaces
    pub context_id: String,
    /// Owning space
    pub memory_space_id: MemorySpaceId,
    /// What the context is for
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Parent context, None for a root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Root of the tree (the context itself for a root)
    pub root_id: String,
    /// Distance from the root (0 for a root)
    pub depth: u32,
    /// Direct children, in creation order
    #[serde(default)]
    pub child_ids: Vec<String>,
    pub status: ContextStatus,
    /// Participants working in this context
    #[serde(default)]
    pub participants: Vec<String>,
    /// Other spaces allowed to attach children
    #[serde(default)]
    pub granted_access: Vec<GrantedAccess>,
    /// Workflow payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub created_at: Millis,
    pub updated_at: Millis,
    /// When the status last became `Completed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Millis>,
    /// Version and prior `{status, data, description}` values
    #[serde(flatten)]
    pub history: VersionHistory<ContextSnapshot>,
}

impl ContextRecord {
    /// True if `space` owns the context or was granted access to it
    pub fn grants(&self, space: &MemorySpaceId) -> bool {
        &self.memory_space_id == space
            || self.granted_access.iter().any(|g| &g.memory_space_id == space)
    }
}

impl Versioned for ContextRecord {
    type Snapshot = ContextSnapshot;

    fn history(&self) -> &VersionHistory<ContextSnapshot> {
        &self.history
    }

    fn history_mut(&mut self) -> &mut VersionHistory<ContextSnapshot> {
        &mut self.history
    }

    fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            status: self.status,
            data: self.data.clone(),
            description: self.description.clone(),
        }
    }

    fn apply_snapshot(&mut self, data: &ContextSnapshot) {
        self.status = data.status;
        self.data = data.data.clone();
        self.description = data.description.clone();
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

/// Input to `ContextStore::create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateContext {
    #[serde(default)]
    pub context_id: Option<String>,
    pub memory_space_id: MemorySpaceId,
    pub purpose: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: ContextStatus,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl CreateContext {
    /// A root context
    pub fn new(memory_space_id: impl Into<MemorySpaceId>, purpose: impl Into<String>) -> Self {
        Self {
            context_id: None,
            memory_space_id: memory_space_id.into(),
            purpose: purpose.into(),
            parent_id: None,
            description: None,
            user_id: None,
            status: ContextStatus::Active,
            participants: Vec::new(),
            data: None,
            metadata: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.context_id = Some(id.into());
        self
    }

    /// Attach under an existing context
    pub fn child_of(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participants.push(participant_id.into());
        self
    }

    pub fn data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

/// Changes applied by `ContextStore::update`; None leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextUpdate {
    pub status: Option<ContextStatus>,
    /// Replacement payload
    pub data: Option<JsonValue>,
    pub description: Option<String>,
}

impl ContextUpdate {
    /// True if nothing would change
    pub fn is_empty(&self) -> bool {
        self == &ContextUpdate::default()
    }
}

/// Filter for listing and counting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextFilter {
    pub memory_space_id: Option<MemorySpaceId>,
    pub status: Option<ContextStatus>,
    pub user_id: Option<String>,
    pub parent_id: Option<String>,
    pub root_id: Option<String>,
    pub depth: Option<u32>,
    pub limit: Option<usize>,
}

impl ContextFilter {
    pub(crate) fn matches(&self, context: &ContextRecord) -> bool {
        self.memory_space_id
            .as_ref()
            .map_or(true, |s| &context.memory_space_id == s)
            && self.status.map_or(true, |s| context.status == s)
            && self
                .user_id
                .as_ref()
                .map_or(true, |u| context.user_id.as_ref() == Some(u))
            && self
                .parent_id
                .as_ref()
                .map_or(true, |p| context.parent_id.as_ref() == Some(p))
            && self.root_id.as_ref().map_or(true, |r| &context.root_id == r)
            && self.depth.map_or(true, |d| context.depth == d)
    }
}

/// Outcome of `ContextStore::delete`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextDeleteReport {
    /// Removed contexts, deepest first, the requested context last
    pub deleted: Vec<String>,
    /// Descendants that could not be removed and lost their parent
    #[serde(default)]
    pub orphaned: Vec<String>,
}

/// A context with its surroundings in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextChain {
    pub current: ContextRecord,
    pub root: ContextRecord,
    /// From the root down to the parent
    pub ancestors: Vec<ContextRecord>,
    pub parent: Option<ContextRecord>,
    /// Other children of the parent
    pub siblings: Vec<ContextRecord>,
    pub children: Vec<ContextRecord>,
    pub depth: u32,
}
