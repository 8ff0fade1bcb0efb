//! Memory layer primitives
//!
//! Each facade is stateless: it holds an `Arc<Database>` and runs every
//! public operation as one atomic unit against its table.
//!
//! - `immutable`: versioned `(type, id)` records
//! - `conversation`: append-only conversation log
//! - `mutable`: live key-value entries with atomic operators and transactions
//! - `vector`: searchable memories with embeddings and streaming writes
//! - `fact`: subject-predicate-object facts with supersession chains
//! - `context`: workflow context tree
//! - `space`: memory space registry and cascade deletion
//! - `a2a`: agent-to-agent messaging on top of memories and conversations
//! - `versioned`: embedded version history shared by several layers

pub mod a2a;
pub mod context;
pub mod conversation;
pub mod fact;
pub mod immutable;
pub mod mutable;
pub mod space;
pub mod vector;
pub mod versioned;

pub use a2a::{A2ASendOptions, A2ASendResult, BroadcastResult, A2A};
pub use context::{
    ContextChain, ContextDeleteReport, ContextFilter, ContextRecord, ContextSnapshot,
    ContextStatus, ContextStore, ContextUpdate, CreateContext, GrantedAccess,
};
pub use conversation::{
    ConversationFilter, ConversationRecord, ConversationSearchHit, ConversationStore,
    ConversationType, CreateConversation, ExportFormat, HistoryOptions, HistoryPage, Message,
    MessageRole, NewMessage, Participants, SearchConversations, SortOrder,
};
pub use fact::{
    FactFilter, FactRecord, FactSourceRef, FactSourceType, FactStore, FactType, FactUpdate,
    StoreFact,
};
pub use immutable::{ImmutableEntry, ImmutableFilter, ImmutableKey, ImmutableRecord, ImmutableStore};
pub use mutable::{
    MutableFilter, MutableKey, MutableRecord, MutableStore, SetOptions, TransactionOp,
    TransactionResult, UpdateOp,
};
pub use space::{
    CascadeReport, MemorySpace, MemorySpaceFilter, MemorySpaceRegistry, MemorySpaceStats,
    MemorySpaceUpdate, NewParticipant, Participant, RegisterMemorySpace, SpaceStatus, SpaceType,
};
pub use vector::{
    ContentType, ConversationRef, FactRef, ImmutableRef, MemoryFilter, MemoryRecord,
    MemorySearch, MemorySearchHit, MemorySnapshot, MemorySource, MemoryStore, MemoryUpdate,
    MutableRef, SourceType, StoreMemory,
};
pub use versioned::{PurgeVersionsResult, VersionHistory, VersionSnapshot, Versioned};

use cortex_core::{CortexError, MemorySpaceId, Scope};

/// Error for a write whose target another memory space owns
///
/// Returns None when `owner` is the caller's space or unknown, so the
/// caller can report NOT_FOUND instead.
pub(crate) fn owned_elsewhere(
    kind: &str,
    id: &str,
    space: &MemorySpaceId,
    owner: Option<Scope>,
) -> Option<CortexError> {
    match owner {
        Some(owner) if owner.space() != Some(space) => Some(CortexError::permission_denied(
            format!("{} {} belongs to memory space {}", kind, id, owner),
        )),
        _ => None,
    }
}
