//! Output enum
//!
//! Every command produces exactly one `Output` variant. Outputs are
//! adjacently tagged (`{"type": "...", "data": ...}`) so a host can
//! dispatch on the shape without knowing which command produced it.
//! `Maybe*` variants carry `None` for absent records and for reads a
//! memory space is not allowed to see.

use cortex_engine::{
    A2ASendResult, BroadcastResult, CascadeReport, ContextChain, ContextDeleteReport,
    ContextRecord, ConversationRecord, ConversationSearchHit, CortexConfig, FactRecord,
    HistoryPage, ImmutableRecord, MemoryRecord, MemorySearchHit, MemorySpace, MemorySpaceStats,
    Message, MutableRecord, PurgeVersionsResult, TransactionResult,
};
use serde::{Deserialize, Serialize};

use crate::types::DatabaseInfo;

/// Result of a successfully executed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Output {
    // ==================== Scalars ====================
    Unit,
    Bool(bool),
    Count(usize),
    /// Exported documents (JSON or CSV)
    Text(String),
    Pong { version: String },
    DatabaseInfo(DatabaseInfo),
    Config(CortexConfig),

    // ==================== Memory spaces ====================
    Space(MemorySpace),
    MaybeSpace(Option<MemorySpace>),
    Spaces(Vec<MemorySpace>),
    SpaceStats(MemorySpaceStats),
    Cascade(CascadeReport),

    // ==================== Conversations ====================
    Conversation(ConversationRecord),
    MaybeConversation(Option<ConversationRecord>),
    Conversations(Vec<ConversationRecord>),
    History(Option<HistoryPage>),
    MaybeMessage(Option<Message>),
    Messages(Vec<Message>),
    ConversationHits(Vec<ConversationSearchHit>),

    // ==================== Immutable records ====================
    Immutable(ImmutableRecord),
    MaybeImmutable(Option<ImmutableRecord>),
    Immutables(Vec<ImmutableRecord>),
    VersionsPurged(PurgeVersionsResult),

    // ==================== Mutable entries ====================
    Mutable(MutableRecord),
    MaybeMutable(Option<MutableRecord>),
    Mutables(Vec<MutableRecord>),
    Transaction(TransactionResult),

    // ==================== Memories ====================
    Memory(MemoryRecord),
    MaybeMemory(Option<MemoryRecord>),
    Memories(Vec<MemoryRecord>),
    MemoryHits(Vec<MemorySearchHit>),

    // ==================== Facts ====================
    Fact(FactRecord),
    MaybeFact(Option<FactRecord>),
    Facts(Vec<FactRecord>),

    // ==================== Contexts ====================
    Context(ContextRecord),
    MaybeContext(Option<ContextRecord>),
    Contexts(Vec<ContextRecord>),
    ContextChain(ContextChain),
    ContextDeleted(ContextDeleteReport),

    // ==================== Agent-to-agent ====================
    A2aSent(A2ASendResult),
    A2aBroadcast(BroadcastResult),
}
