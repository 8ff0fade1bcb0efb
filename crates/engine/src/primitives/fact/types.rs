//! Fact record types

use cortex_core::{MemorySpaceId, Metadata, Millis, Tags};
use serde::{Deserialize, Serialize};

/// Kind of statement a fact makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactType {
    /// Likes and dislikes
    Preference,
    /// Who someone is
    Identity,
    /// General knowledge
    Knowledge,
    /// How two entities relate
    Relationship,
    /// Something that happened
    Event,
    /// Something that was noticed
    Observation,
    /// Anything else
    Custom,
}

impl FactType {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::Preference => "preference",
            FactType::Identity => "identity",
            FactType::Knowledge => "knowledge",
            FactType::Relationship => "relationship",
            FactType::Event => "event",
            FactType::Observation => "observation",
            FactType::Custom => "custom",
        }
    }
}

/// Where a fact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactSourceType {
    /// Extracted from a conversation
    Conversation,
    /// Written by the system
    System,
    /// Output of a tool
    Tool,
    /// Entered directly
    #[default]
    Manual,
    /// Received from another agent
    A2a,
}

/// Records a fact was derived from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactSourceRef {
    /// Source conversation
    pub conversation_id: Option<String>,
    /// Source messages
    pub message_ids: Vec<String>,
    /// Source memory
    pub memory_id: Option<String>,
}

/// A stored fact
///
/// `supersedes` / `superseded_by` link fact identities into a belief
/// revision chain. The fact with no `superseded_by` is the current belief.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub fact_id: String,
    pub memory_space_id: MemorySpaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// The statement
    pub fact: String,
    pub fact_type: FactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// 0..=100
    pub confidence: u8,
    pub source_type: FactSourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<FactSourceRef>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Start of the validity window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<Millis>,
    /// End of the validity window (exclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Millis>,
    /// Position in the revision chain, starting at 1
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersession_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub created_at: Millis,
    pub updated_at: Millis,
}

impl FactRecord {
    /// True if no other fact supersedes this one
    pub fn is_current(&self) -> bool {
        self.superseded_by.is_none()
    }

    /// True if `t` falls inside the validity window
    pub fn is_valid_at(&self, t: Millis) -> bool {
        self.valid_from.map_or(true, |from| from <= t) && self.valid_until.map_or(true, |until| t < until)
    }

    /// Case-insensitive substring match over the statement and the triple
    pub(crate) fn contains_text(&self, needle_lower: &str) -> bool {
        std::iter::once(Some(self.fact.as_str()))
            .chain([
                self.subject.as_deref(),
                self.predicate.as_deref(),
                self.object.as_deref(),
            ])
            .flatten()
            .any(|text| text.to_lowercase().contains(needle_lower))
    }

    pub(crate) fn apply(&mut self, update: FactUpdate) {
        if let Some(fact) = update.fact {
            self.fact = fact;
        }
        if let Some(confidence) = update.confidence {
            self.confidence = confidence;
        }
        if let Some(subject) = update.subject {
            self.subject = Some(subject);
        }
        if let Some(predicate) = update.predicate {
            self.predicate = Some(predicate);
        }
        if let Some(object) = update.object {
            self.object = Some(object);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        if let Some(metadata) = update.metadata {
            self.metadata = Some(metadata);
        }
    }
}

/// Input to `FactStore::store`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreFact {
    #[serde(default)]
    pub fact_id: Option<String>,
    pub fact: String,
    pub fact_type: FactType,
    pub confidence: u8,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub source_type: FactSourceType,
    #[serde(default)]
    pub source_ref: Option<FactSourceRef>,
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub valid_from: Option<Millis>,
    #[serde(default)]
    pub valid_until: Option<Millis>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl StoreFact {
    /// A manually entered fact
    pub fn new(fact: impl Into<String>, fact_type: FactType, confidence: u8) -> Self {
        Self {
            fact_id: None,
            fact: fact.into(),
            fact_type,
            confidence,
            subject: None,
            predicate: None,
            object: None,
            source_type: FactSourceType::default(),
            source_ref: None,
            participant_id: None,
            user_id: None,
            tags: Tags::new(),
            category: None,
            valid_from: None,
            valid_until: None,
            metadata: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.fact_id = Some(id.into());
        self
    }

    /// Attach a subject-predicate-object triple
    pub fn triple(mut self, subject: impl Into<String>, predicate: impl Into<String>, object: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self.predicate = Some(predicate.into());
        self.object = Some(object.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn source(mut self, source_type: FactSourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn source_ref(mut self, source_ref: FactSourceRef) -> Self {
        self.source_ref = Some(source_ref);
        self
    }

    pub fn participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn valid_from(mut self, t: Millis) -> Self {
        self.valid_from = Some(t);
        self
    }

    pub fn valid_until(mut self, t: Millis) -> Self {
        self.valid_until = Some(t);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Field changes for `update` and `update_in_place`; None leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactUpdate {
    pub fact: Option<String>,
    pub confidence: Option<u8>,
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
    /// Replacement tag set
    pub tags: Option<Tags>,
    pub category: Option<String>,
    /// Replacement metadata
    pub metadata: Option<Metadata>,
}

impl FactUpdate {
    /// True if nothing would change
    pub fn is_empty(&self) -> bool {
        self == &FactUpdate::default()
    }
}

/// Filter for listing, counting, searching and export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactFilter {
    pub fact_type: Option<FactType>,
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub participant_id: Option<String>,
    pub user_id: Option<String>,
    /// Only facts carrying every one of these tags
    pub tags: Tags,
    pub min_confidence: Option<u8>,
    /// Include facts superseded by a newer belief
    pub include_superseded: bool,
    /// Include facts whose validity window is closed
    pub include_invalid: bool,
    pub limit: Option<usize>,
}

impl FactFilter {
    pub(crate) fn matches(&self, fact: &FactRecord, now: Millis) -> bool {
        (self.include_superseded || fact.is_current())
            && (self.include_invalid || fact.valid_until.map_or(true, |until| now < until))
            && self.fact_type.map_or(true, |t| fact.fact_type == t)
            && self
                .subject
                .as_ref()
                .map_or(true, |s| fact.subject.as_ref() == Some(s))
            && self
                .predicate
                .as_ref()
                .map_or(true, |p| fact.predicate.as_ref() == Some(p))
            && self
                .participant_id
                .as_ref()
                .map_or(true, |p| fact.participant_id.as_ref() == Some(p))
            && self
                .user_id
                .as_ref()
                .map_or(true, |u| fact.user_id.as_ref() == Some(u))
            && self.tags.iter().all(|t| fact.tags.contains(t))
            && self.min_confidence.map_or(true, |m| fact.confidence >= m)
    }
}
