//! Universal entity addressing
//!
//! `EntityRef` names any record in any layer. It is carried by errors and
//! rendered as a URI (`memory://team-a/mem-123`) for logs and messages.

use crate::types::{MemorySpaceId, Scope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a record in one of the memory layers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    /// A registered memory space
    MemorySpace {
        /// Space id
        id: MemorySpaceId,
    },
    /// A participant of a memory space
    Participant {
        /// Space the participant belongs to
        space: MemorySpaceId,
        /// Participant id
        id: String,
    },
    /// A conversation log
    Conversation {
        /// Owning space
        space: MemorySpaceId,
        /// Conversation id
        id: String,
    },
    /// One message inside a conversation
    Message {
        /// Conversation id
        conversation_id: String,
        /// Message id
        message_id: String,
    },
    /// A versioned immutable record
    Immutable {
        /// Space or global scope
        scope: Scope,
        /// Record type
        record_type: String,
        /// Record id within the type
        id: String,
    },
    /// A mutable key-value entry
    Mutable {
        /// Owning space
        space: MemorySpaceId,
        /// Namespace
        namespace: String,
        /// Key within the namespace
        key: String,
    },
    /// A vector memory
    Memory {
        /// Owning space
        space: MemorySpaceId,
        /// Memory id
        id: String,
    },
    /// A fact
    Fact {
        /// Owning space
        space: MemorySpaceId,
        /// Fact id
        id: String,
    },
    /// A workflow context
    Context {
        /// Context id
        id: String,
    },
}

impl EntityRef {
    /// Reference a memory space
    pub fn memory_space(id: &MemorySpaceId) -> Self {
        EntityRef::MemorySpace { id: id.clone() }
    }

    /// Reference a memory space participant
    pub fn participant(space: &MemorySpaceId, id: impl Into<String>) -> Self {
        EntityRef::Participant {
            space: space.clone(),
            id: id.into(),
        }
    }

    /// Reference a conversation
    pub fn conversation(space: &MemorySpaceId, id: impl Into<String>) -> Self {
        EntityRef::Conversation {
            space: space.clone(),
            id: id.into(),
        }
    }

    /// Reference a message
    pub fn message(conversation_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        EntityRef::Message {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
        }
    }

    /// Reference an immutable record
    pub fn immutable(scope: &Scope, record_type: impl Into<String>, id: impl Into<String>) -> Self {
        EntityRef::Immutable {
            scope: scope.clone(),
            record_type: record_type.into(),
            id: id.into(),
        }
    }

    /// Reference a mutable entry
    pub fn mutable(
        space: &MemorySpaceId,
        namespace: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        EntityRef::Mutable {
            space: space.clone(),
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Reference a vector memory
    pub fn memory(space: &MemorySpaceId, id: impl Into<String>) -> Self {
        EntityRef::Memory {
            space: space.clone(),
            id: id.into(),
        }
    }

    /// Reference a fact
    pub fn fact(space: &MemorySpaceId, id: impl Into<String>) -> Self {
        EntityRef::Fact {
            space: space.clone(),
            id: id.into(),
        }
    }

    /// Reference a context
    pub fn context(id: impl Into<String>) -> Self {
        EntityRef::Context { id: id.into() }
    }

    /// Memory space the referenced record belongs to, if any
    pub fn space(&self) -> Option<&MemorySpaceId> {
        match self {
            EntityRef::MemorySpace { id } => Some(id),
            EntityRef::Participant { space, .. }
            | EntityRef::Conversation { space, .. }
            | EntityRef::Mutable { space, .. }
            | EntityRef::Memory { space, .. }
            | EntityRef::Fact { space, .. } => Some(space),
            EntityRef::Immutable { scope, .. } => scope.space(),
            EntityRef::Message { .. } | EntityRef::Context { .. } => None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::MemorySpace { id } => write!(f, "space://{}", id),
            EntityRef::Participant { space, id } => write!(f, "participant://{}/{}", space, id),
            EntityRef::Conversation { space, id } => write!(f, "conversation://{}/{}", space, id),
            EntityRef::Message {
                conversation_id,
                message_id,
            } => write!(f, "message://{}/{}", conversation_id, message_id),
            EntityRef::Immutable {
                scope,
                record_type,
                id,
            } => write!(f, "immutable://{}/{}/{}", scope, record_type, id),
            EntityRef::Mutable {
                space,
                namespace,
                key,
            } => write!(f, "mutable://{}/{}/{}", space, namespace, key),
            EntityRef::Memory { space, id } => write!(f, "memory://{}/{}", space, id),
            EntityRef::Fact { space, id } => write!(f, "fact://{}/{}", space, id),
            EntityRef::Context { id } => write!(f, "context://{}", id),
        }
    }
}
