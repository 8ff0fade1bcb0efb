//! Command enum
//!
//! One variant per public operation of the engine. Commands are
//! internally tagged by `command`, with snake_case names:
//!
//! ```text
//! {"command": "fact_query_by_subject", "space": "team-a", "subject": "user-123"}
//! ```
//!
//! Optional fields (filters, options, expected versions) may be omitted.

use cortex_core::{JsonValue, MemorySpaceId, Metadata, Millis};
use cortex_engine::{
    A2ASendOptions, ContextFilter, ContextUpdate, ConversationFilter, CortexConfig, CreateContext,
    CreateConversation, ExportFormat, FactFilter, FactUpdate, HistoryOptions, ImmutableEntry,
    ImmutableFilter, MemoryFilter, MemorySearch, MemorySpaceFilter, MemorySpaceUpdate,
    MemoryUpdate, MutableFilter, NewMessage, NewParticipant, RegisterMemorySpace,
    SearchConversations, SetOptions, StoreFact, StoreMemory, TransactionOp, UpdateOp,
};
use serde::{Deserialize, Serialize};

/// A single operation against the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    // =========================================================================
    // Database
    // =========================================================================
    Ping,
    Info,
    ConfigGet,
    /// Replace the running configuration
    ConfigSet {
        config: CortexConfig,
    },

    // =========================================================================
    // Memory spaces
    // =========================================================================
    SpaceRegister {
        input: RegisterMemorySpace,
    },
    SpaceUpdate {
        space: MemorySpaceId,
        update: MemorySpaceUpdate,
    },
    SpaceAddParticipant {
        space: MemorySpaceId,
        participant: NewParticipant,
    },
    SpaceRemoveParticipant {
        space: MemorySpaceId,
        participant_id: String,
    },
    SpaceArchive {
        space: MemorySpaceId,
    },
    SpaceReactivate {
        space: MemorySpaceId,
    },
    SpaceDelete {
        space: MemorySpaceId,
        #[serde(default)]
        cascade: bool,
    },
    SpaceGet {
        space: MemorySpaceId,
    },
    SpaceList {
        #[serde(default)]
        filter: MemorySpaceFilter,
    },
    SpaceCount {
        #[serde(default)]
        filter: MemorySpaceFilter,
    },
    SpaceStats {
        space: MemorySpaceId,
    },
    SpacePurgeAll,

    // =========================================================================
    // Conversations
    // =========================================================================
    ConversationCreate {
        input: CreateConversation,
    },
    ConversationAddMessage {
        space: MemorySpaceId,
        conversation_id: String,
        message: NewMessage,
    },
    ConversationDelete {
        space: MemorySpaceId,
        conversation_id: String,
    },
    ConversationDeleteMany {
        space: MemorySpaceId,
        #[serde(default)]
        filter: ConversationFilter,
    },
    ConversationGet {
        space: MemorySpaceId,
        conversation_id: String,
    },
    ConversationHistory {
        space: MemorySpaceId,
        conversation_id: String,
        #[serde(default)]
        options: HistoryOptions,
    },
    ConversationGetMessage {
        space: MemorySpaceId,
        conversation_id: String,
        message_id: String,
    },
    ConversationGetMessages {
        space: MemorySpaceId,
        conversation_id: String,
        message_ids: Vec<String>,
    },
    ConversationFind {
        space: MemorySpaceId,
        user_id: String,
        agent_id: String,
    },
    ConversationList {
        space: MemorySpaceId,
        #[serde(default)]
        filter: ConversationFilter,
    },
    ConversationCount {
        space: MemorySpaceId,
        #[serde(default)]
        filter: ConversationFilter,
    },
    ConversationSearch {
        space: MemorySpaceId,
        request: SearchConversations,
    },
    ConversationExport {
        space: MemorySpaceId,
        #[serde(default)]
        filter: ConversationFilter,
        #[serde(default)]
        format: ExportFormat,
    },
    ConversationPurgeAll,

    // =========================================================================
    // Immutable records
    // =========================================================================
    /// Store a new record or the next version of an existing one
    ImmutableStore {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        entry: ImmutableEntry,
        /// Compare-and-swap on the current version
        #[serde(default)]
        expected_version: Option<u64>,
    },
    ImmutableGet {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        record_type: String,
        id: String,
    },
    ImmutableGetVersion {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        record_type: String,
        id: String,
        version: u64,
    },
    ImmutableHistory {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        record_type: String,
        id: String,
    },
    ImmutableGetAt {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        record_type: String,
        id: String,
        timestamp: Millis,
    },
    ImmutableList {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        #[serde(default)]
        filter: ImmutableFilter,
    },
    ImmutableSearch {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        query: String,
        #[serde(default)]
        filter: ImmutableFilter,
    },
    ImmutableCount {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        #[serde(default)]
        filter: ImmutableFilter,
    },
    ImmutablePurge {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        record_type: String,
        id: String,
    },
    ImmutablePurgeMany {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        #[serde(default)]
        filter: ImmutableFilter,
    },
    ImmutablePurgeVersions {
        #[serde(default)]
        space: Option<MemorySpaceId>,
        record_type: String,
        id: String,
        keep_latest: usize,
    },
    ImmutablePurgeAll,

    // =========================================================================
    // Mutable key-value
    // =========================================================================
    MutableSet {
        space: MemorySpaceId,
        namespace: String,
        key: String,
        value: JsonValue,
        #[serde(default)]
        options: SetOptions,
    },
    MutableUpdate {
        space: MemorySpaceId,
        namespace: String,
        key: String,
        op: UpdateOp,
    },
    MutableIncrement {
        space: MemorySpaceId,
        namespace: String,
        key: String,
        amount: JsonValue,
    },
    MutableDecrement {
        space: MemorySpaceId,
        namespace: String,
        key: String,
        amount: JsonValue,
    },
    MutableAppend {
        space: MemorySpaceId,
        namespace: String,
        key: String,
        element: JsonValue,
    },
    MutableDelete {
        space: MemorySpaceId,
        namespace: String,
        key: String,
    },
    MutableGet {
        space: MemorySpaceId,
        namespace: String,
        key: String,
    },
    MutableExists {
        space: MemorySpaceId,
        namespace: String,
        key: String,
    },
    MutableList {
        space: MemorySpaceId,
        #[serde(default)]
        filter: MutableFilter,
    },
    MutableCount {
        space: MemorySpaceId,
        #[serde(default)]
        filter: MutableFilter,
    },
    /// All-or-nothing batch
    MutableTransaction {
        space: MemorySpaceId,
        ops: Vec<TransactionOp>,
    },
    MutablePurgeNamespace {
        space: MemorySpaceId,
        namespace: String,
    },
    MutablePurgeAll,

    // =========================================================================
    // Vector memories
    // =========================================================================
    MemoryStore {
        space: MemorySpaceId,
        input: StoreMemory,
    },
    MemoryUpdate {
        space: MemorySpaceId,
        memory_id: String,
        update: MemoryUpdate,
        /// Compare-and-swap on the current version
        #[serde(default)]
        expected_version: Option<u64>,
    },
    MemoryRecordAccess {
        space: MemorySpaceId,
        memory_id: String,
    },
    MemoryDelete {
        space: MemorySpaceId,
        memory_id: String,
    },
    MemoryDeleteMany {
        space: MemorySpaceId,
        #[serde(default)]
        filter: MemoryFilter,
    },
    MemoryPurgeVersions {
        space: MemorySpaceId,
        memory_id: String,
        keep_latest: usize,
    },
    MemoryGet {
        space: MemorySpaceId,
        memory_id: String,
    },
    MemoryGetVersion {
        space: MemorySpaceId,
        memory_id: String,
        version: u64,
    },
    MemoryHistory {
        space: MemorySpaceId,
        memory_id: String,
    },
    MemoryGetAt {
        space: MemorySpaceId,
        memory_id: String,
        timestamp: Millis,
    },
    MemoryList {
        space: MemorySpaceId,
        #[serde(default)]
        filter: MemoryFilter,
    },
    MemoryCount {
        space: MemorySpaceId,
        #[serde(default)]
        filter: MemoryFilter,
    },
    MemorySearch {
        space: MemorySpaceId,
        search: MemorySearch,
    },
    /// Start a streaming memory
    MemoryStorePartial {
        space: MemorySpaceId,
        input: StoreMemory,
    },
    MemoryUpdatePartial {
        space: MemorySpaceId,
        memory_id: String,
        content: String,
        #[serde(default)]
        metadata: Option<Metadata>,
    },
    MemoryFinalizePartial {
        space: MemorySpaceId,
        memory_id: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        embedding: Option<Vec<f32>>,
    },
    MemoryPurgeAll,

    // =========================================================================
    // Facts
    // =========================================================================
    FactStore {
        space: MemorySpaceId,
        input: StoreFact,
    },
    /// Revise a fact by superseding it with a new one
    FactUpdate {
        space: MemorySpaceId,
        fact_id: String,
        update: FactUpdate,
        #[serde(default)]
        reason: Option<String>,
    },
    FactUpdateInPlace {
        space: MemorySpaceId,
        fact_id: String,
        update: FactUpdate,
    },
    FactSupersede {
        space: MemorySpaceId,
        old_fact_id: String,
        new_fact_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    FactConsolidate {
        space: MemorySpaceId,
        fact_ids: Vec<String>,
        keep_fact_id: String,
    },
    FactDelete {
        space: MemorySpaceId,
        fact_id: String,
    },
    FactGet {
        space: MemorySpaceId,
        fact_id: String,
    },
    FactHistory {
        space: MemorySpaceId,
        fact_id: String,
    },
    FactQueryBySubject {
        space: MemorySpaceId,
        subject: String,
        #[serde(default)]
        include_superseded: bool,
    },
    FactQueryByRelationship {
        space: MemorySpaceId,
        subject: String,
        predicate: String,
        #[serde(default)]
        include_superseded: bool,
    },
    FactList {
        space: MemorySpaceId,
        #[serde(default)]
        filter: FactFilter,
    },
    FactCount {
        space: MemorySpaceId,
        #[serde(default)]
        filter: FactFilter,
    },
    FactSearch {
        space: MemorySpaceId,
        query: String,
        #[serde(default)]
        filter: FactFilter,
    },
    FactExport {
        space: MemorySpaceId,
        #[serde(default)]
        filter: FactFilter,
        #[serde(default)]
        format: ExportFormat,
    },
    FactPurgeAll,

    // =========================================================================
    // Contexts
    // =========================================================================
    ContextCreate {
        input: CreateContext,
    },
    ContextUpdate {
        context_id: String,
        update: ContextUpdate,
        /// Compare-and-swap on the current version
        #[serde(default)]
        expected_version: Option<u64>,
    },
    ContextDelete {
        context_id: String,
        #[serde(default)]
        cascade: bool,
    },
    ContextAddParticipant {
        context_id: String,
        participant_id: String,
    },
    ContextGrantAccess {
        context_id: String,
        space: MemorySpaceId,
        scope: String,
    },
    ContextGet {
        context_id: String,
    },
    ContextChain {
        context_id: String,
    },
    ContextRoot {
        context_id: String,
    },
    ContextChildren {
        context_id: String,
        #[serde(default)]
        recursive: bool,
    },
    ContextList {
        #[serde(default)]
        filter: ContextFilter,
    },
    ContextCount {
        #[serde(default)]
        filter: ContextFilter,
    },
    ContextGetVersion {
        context_id: String,
        version: u64,
    },
    ContextHistory {
        context_id: String,
    },
    ContextGetAt {
        context_id: String,
        timestamp: Millis,
    },
    ContextPurgeAll,

    // =========================================================================
    // Agent-to-agent messaging
    // =========================================================================
    A2aSend {
        from: MemorySpaceId,
        to: MemorySpaceId,
        message: String,
        #[serde(default)]
        options: A2ASendOptions,
    },
    A2aBroadcast {
        from: MemorySpaceId,
        recipients: Vec<MemorySpaceId>,
        message: String,
        #[serde(default)]
        options: A2ASendOptions,
    },
    A2aConversation {
        a: MemorySpaceId,
        b: MemorySpaceId,
    },
}

impl Command {
    /// True if the command never changes state
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Command::Ping
                | Command::Info
                | Command::ConfigGet
                | Command::SpaceGet { .. }
                | Command::SpaceList { .. }
                | Command::SpaceCount { .. }
                | Command::SpaceStats { .. }
                | Command::ConversationGet { .. }
                | Command::ConversationHistory { .. }
                | Command::ConversationGetMessage { .. }
                | Command::ConversationGetMessages { .. }
                | Command::ConversationFind { .. }
                | Command::ConversationList { .. }
                | Command::ConversationCount { .. }
                | Command::ConversationSearch { .. }
                | Command::ConversationExport { .. }
                | Command::ImmutableGet { .. }
                | Command::ImmutableGetVersion { .. }
                | Command::ImmutableHistory { .. }
                | Command::ImmutableGetAt { .. }
                | Command::ImmutableList { .. }
                | Command::ImmutableSearch { .. }
                | Command::ImmutableCount { .. }
                | Command::MutableGet { .. }
                | Command::MutableExists { .. }
                | Command::MutableList { .. }
                | Command::MutableCount { .. }
                | Command::MemoryGet { .. }
                | Command::MemoryGetVersion { .. }
                | Command::MemoryHistory { .. }
                | Command::MemoryGetAt { .. }
                | Command::MemoryList { .. }
                | Command::MemoryCount { .. }
                | Command::MemorySearch { .. }
                | Command::FactGet { .. }
                | Command::FactHistory { .. }
                | Command::FactQueryBySubject { .. }
                | Command::FactQueryByRelationship { .. }
                | Command::FactList { .. }
                | Command::FactCount { .. }
                | Command::FactSearch { .. }
                | Command::FactExport { .. }
                | Command::ContextGet { .. }
                | Command::ContextChain { .. }
                | Command::ContextRoot { .. }
                | Command::ContextChildren { .. }
                | Command::ContextList { .. }
                | Command::ContextCount { .. }
                | Command::ContextGetVersion { .. }
                | Command::ContextHistory { .. }
                | Command::ContextGetAt { .. }
                | Command::A2aConversation { .. }
        )
    }
}
