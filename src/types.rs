//! Public types for the CortexDB API.
//!
//! This module re-exports types from internal crates with a clean public interface.

// ============================================================================
// Identifiers, values and time
// ============================================================================

pub use cortex_core::{Clock, JsonValue, MemorySpaceId, Metadata, Millis, Tags};

// Error codes shared by every layer
pub use cortex_core::ErrorCode;

// ============================================================================
// Opening a store
// ============================================================================

pub use cortex_engine::{CortexConfig, FactsConfig, LimitsConfig, SearchConfig};
pub use cortex_security::{AccessMode, Environment, OpenOptions};

// ============================================================================
// Memory spaces
// ============================================================================

pub use cortex_engine::{
    CascadeReport, MemorySpace, MemorySpaceFilter, MemorySpaceStats, MemorySpaceUpdate,
    NewParticipant, Participant, RegisterMemorySpace, SpaceStatus, SpaceType,
};

// ============================================================================
// Layers
// ============================================================================

// Conversations
pub use cortex_engine::{
    ConversationFilter, ConversationRecord, ConversationSearchHit, ConversationType,
    CreateConversation, ExportFormat, HistoryOptions, HistoryPage, Message, MessageRole,
    NewMessage, Participants, SearchConversations, SortOrder,
};

// Immutable records
pub use cortex_engine::{ImmutableEntry, ImmutableFilter, ImmutableRecord};

// Mutable entries
pub use cortex_engine::{
    MutableFilter, MutableRecord, SetOptions, TransactionOp, TransactionResult, UpdateOp,
};

// Memories
pub use cortex_engine::{
    ContentType, ConversationRef, FactRef, ImmutableRef, MemoryFilter, MemoryRecord,
    MemorySearch, MemorySearchHit, MemorySource, MemoryUpdate, MutableRef, SourceType,
    StoreMemory,
};

// Facts
pub use cortex_engine::{
    FactFilter, FactRecord, FactSourceRef, FactSourceType, FactType, FactUpdate, StoreFact,
};

// Contexts
pub use cortex_engine::{
    ContextChain, ContextDeleteReport, ContextFilter, ContextRecord, ContextStatus, ContextUpdate,
    CreateContext, GrantedAccess,
};

// Agent-to-agent messaging
pub use cortex_engine::{A2ASendOptions, A2ASendResult, BroadcastResult};

// Text matching
pub use cortex_engine::search::MatchMode;

// Version chains
pub use cortex_engine::{PurgeVersionsResult, VersionSnapshot};
