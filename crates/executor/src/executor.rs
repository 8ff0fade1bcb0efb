//! Command dispatch
//!
//! `Executor::execute` is the single entry point: it checks the access mode
//! once, then routes the command to its handler.

use std::sync::Arc;

use cortex_engine::Database;

use crate::bridge::Primitives;
use crate::handlers::{a2a, config, context, conversation, fact, immutable, memory, mutable, space};
use crate::{Command, Error, Output, Result};

/// Executes commands against one database
#[derive(Clone)]
pub struct Executor {
    primitives: Arc<Primitives>,
}

impl Executor {
    /// Executor over an open database
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            primitives: Arc::new(Primitives::new(db)),
        }
    }

    /// The underlying database
    pub fn database(&self) -> &Arc<Database> {
        &self.primitives.db
    }

    /// Execute a JSON-encoded command and return a JSON-encoded result
    ///
    /// Failures are returned as a serialized [`Error`] inside `Err`, so the
    /// caller always gets a JSON document back.
    pub fn execute_json(
        &self,
        request: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, serde_json::Value> {
        let encode_err = |e: Error| {
            serde_json::to_value(&e).unwrap_or_else(|_| serde_json::json!({ "error": "internal" }))
        };
        let command: Command = serde_json::from_value(request).map_err(|e| {
            encode_err(Error::InvalidInput {
                reason: format!("malformed command: {}", e),
            })
        })?;
        let output = self.execute(command).map_err(encode_err)?;
        serde_json::to_value(&output).map_err(|e| {
            encode_err(Error::Serialization {
                reason: e.to_string(),
            })
        })
    }

    /// Execute one command
    pub fn execute(&self, command: Command) -> Result<Output> {
        let p = &self.primitives;
        if !command.is_read_only() && !p.db.access_mode().allows_writes() {
            return Err(Error::PermissionDenied {
                reason: "database is read-only".into(),
            });
        }

        let result = match command {
            // Database
            Command::Ping => config::ping(),
            Command::Info => config::info(p),
            Command::ConfigGet => config::config_get(p),
            Command::ConfigSet { config: cfg } => config::config_set(p, cfg),

            // Memory spaces
            Command::SpaceRegister { input } => space::space_register(p, input),
            Command::SpaceUpdate { space: s, update } => space::space_update(p, s, update),
            Command::SpaceAddParticipant { space: s, participant } => {
                space::space_add_participant(p, s, participant)
            }
            Command::SpaceRemoveParticipant {
                space: s,
                participant_id,
            } => space::space_remove_participant(p, s, participant_id),
            Command::SpaceArchive { space: s } => space::space_archive(p, s),
            Command::SpaceReactivate { space: s } => space::space_reactivate(p, s),
            Command::SpaceDelete { space: s, cascade } => space::space_delete(p, s, cascade),
            Command::SpaceGet { space: s } => space::space_get(p, s),
            Command::SpaceList { filter } => space::space_list(p, filter),
            Command::SpaceCount { filter } => space::space_count(p, filter),
            Command::SpaceStats { space: s } => space::space_stats(p, s),
            Command::SpacePurgeAll => space::space_purge_all(p),

            // Conversations
            Command::ConversationCreate { input } => conversation::conversation_create(p, input),
            Command::ConversationAddMessage {
                space: s,
                conversation_id,
                message,
            } => conversation::conversation_add_message(p, s, conversation_id, message),
            Command::ConversationDelete {
                space: s,
                conversation_id,
            } => conversation::conversation_delete(p, s, conversation_id),
            Command::ConversationDeleteMany { space: s, filter } => {
                conversation::conversation_delete_many(p, s, filter)
            }
            Command::ConversationGet {
                space: s,
                conversation_id,
            } => conversation::conversation_get(p, s, conversation_id),
            Command::ConversationHistory {
                space: s,
                conversation_id,
                options,
            } => conversation::conversation_history(p, s, conversation_id, options),
            Command::ConversationGetMessage {
                space: s,
                conversation_id,
                message_id,
            } => conversation::conversation_get_message(p, s, conversation_id, message_id),
            Command::ConversationGetMessages {
                space: s,
                conversation_id,
                message_ids,
            } => conversation::conversation_get_messages(p, s, conversation_id, message_ids),
            Command::ConversationFind {
                space: s,
                user_id,
                agent_id,
            } => conversation::conversation_find(p, s, user_id, agent_id),
            Command::ConversationList { space: s, filter } => {
                conversation::conversation_list(p, s, filter)
            }
            Command::ConversationCount { space: s, filter } => {
                conversation::conversation_count(p, s, filter)
            }
            Command::ConversationSearch { space: s, request } => {
                conversation::conversation_search(p, s, request)
            }
            Command::ConversationExport {
                space: s,
                filter,
                format,
            } => conversation::conversation_export(p, s, filter, format),
            Command::ConversationPurgeAll => conversation::conversation_purge_all(p),

            // Immutable records
            Command::ImmutableStore {
                space: s,
                entry,
                expected_version,
            } => immutable::immutable_store(p, s, entry, expected_version),
            Command::ImmutableGet {
                space: s,
                record_type,
                id,
            } => immutable::immutable_get(p, s, record_type, id),
            Command::ImmutableGetVersion {
                space: s,
                record_type,
                id,
                version,
            } => immutable::immutable_get_version(p, s, record_type, id, version),
            Command::ImmutableHistory {
                space: s,
                record_type,
                id,
            } => immutable::immutable_history(p, s, record_type, id),
            Command::ImmutableGetAt {
                space: s,
                record_type,
                id,
                timestamp,
            } => immutable::immutable_get_at(p, s, record_type, id, timestamp),
            Command::ImmutableList { space: s, filter } => immutable::immutable_list(p, s, filter),
            Command::ImmutableSearch {
                space: s,
                query,
                filter,
            } => immutable::immutable_search(p, s, query, filter),
            Command::ImmutableCount { space: s, filter } => immutable::immutable_count(p, s, filter),
            Command::ImmutablePurge {
                space: s,
                record_type,
                id,
            } => immutable::immutable_purge(p, s, record_type, id),
            Command::ImmutablePurgeMany { space: s, filter } => {
                immutable::immutable_purge_many(p, s, filter)
            }
            Command::ImmutablePurgeVersions {
                space: s,
                record_type,
                id,
                keep_latest,
            } => immutable::immutable_purge_versions(p, s, record_type, id, keep_latest),
            Command::ImmutablePurgeAll => immutable::immutable_purge_all(p),

            // Mutable key-value
            Command::MutableSet {
                space: s,
                namespace,
                key,
                value,
                options,
            } => mutable::mutable_set(p, s, namespace, key, value, options),
            Command::MutableUpdate {
                space: s,
                namespace,
                key,
                op,
            } => mutable::mutable_update(p, s, namespace, key, op),
            Command::MutableIncrement {
                space: s,
                namespace,
                key,
                amount,
            } => mutable::mutable_increment(p, s, namespace, key, amount),
            Command::MutableDecrement {
                space: s,
                namespace,
                key,
                amount,
            } => mutable::mutable_decrement(p, s, namespace, key, amount),
            Command::MutableAppend {
                space: s,
                namespace,
                key,
                element,
            } => mutable::mutable_append(p, s, namespace, key, element),
            Command::MutableDelete {
                space: s,
                namespace,
                key,
            } => mutable::mutable_delete(p, s, namespace, key),
            Command::MutableGet {
                space: s,
                namespace,
                key,
            } => mutable::mutable_get(p, s, namespace, key),
            Command::MutableExists {
                space: s,
                namespace,
                key,
            } => mutable::mutable_exists(p, s, namespace, key),
            Command::MutableList { space: s, filter } => mutable::mutable_list(p, s, filter),
            Command::MutableCount { space: s, filter } => mutable::mutable_count(p, s, filter),
            Command::MutableTransaction { space: s, ops } => mutable::mutable_transaction(p, s, ops),
            Command::MutablePurgeNamespace { space: s, namespace } => {
                mutable::mutable_purge_namespace(p, s, namespace)
            }
            Command::MutablePurgeAll => mutable::mutable_purge_all(p),

            // Vector memories
            Command::MemoryStore { space: s, input } => memory::memory_store(p, s, input),
            Command::MemoryUpdate {
                space: s,
                memory_id,
                update,
                expected_version,
            } => memory::memory_update(p, s, memory_id, update, expected_version),
            Command::MemoryRecordAccess { space: s, memory_id } => {
                memory::memory_record_access(p, s, memory_id)
            }
            Command::MemoryDelete { space: s, memory_id } => memory::memory_delete(p, s, memory_id),
            Command::MemoryDeleteMany { space: s, filter } => memory::memory_delete_many(p, s, filter),
            Command::MemoryPurgeVersions {
                space: s,
                memory_id,
                keep_latest,
            } => memory::memory_purge_versions(p, s, memory_id, keep_latest),
            Command::MemoryGet { space: s, memory_id } => memory::memory_get(p, s, memory_id),
            Command::MemoryGetVersion {
                space: s,
                memory_id,
                version,
            } => memory::memory_get_version(p, s, memory_id, version),
            Command::MemoryHistory { space: s, memory_id } => memory::memory_history(p, s, memory_id),
            Command::MemoryGetAt {
                space: s,
                memory_id,
                timestamp,
            } => memory::memory_get_at(p, s, memory_id, timestamp),
            Command::MemoryList { space: s, filter } => memory::memory_list(p, s, filter),
            Command::MemoryCount { space: s, filter } => memory::memory_count(p, s, filter),
            Command::MemorySearch { space: s, search } => memory::memory_search(p, s, search),
            Command::MemoryStorePartial { space: s, input } => {
                memory::memory_store_partial(p, s, input)
            }
            Command::MemoryUpdatePartial {
                space: s,
                memory_id,
                content,
                metadata,
            } => memory::memory_update_partial(p, s, memory_id, content, metadata),
            Command::MemoryFinalizePartial {
                space: s,
                memory_id,
                content,
                embedding,
            } => memory::memory_finalize_partial(p, s, memory_id, content, embedding),
            Command::MemoryPurgeAll => memory::memory_purge_all(p),

            // Facts
            Command::FactStore { space: s, input } => fact::fact_store(p, s, input),
            Command::FactUpdate {
                space: s,
                fact_id,
                update,
                reason,
            } => fact::fact_update(p, s, fact_id, update, reason),
            Command::FactUpdateInPlace {
                space: s,
                fact_id,
                update,
            } => fact::fact_update_in_place(p, s, fact_id, update),
            Command::FactSupersede {
                space: s,
                old_fact_id,
                new_fact_id,
                reason,
            } => fact::fact_supersede(p, s, old_fact_id, new_fact_id, reason),
            Command::FactConsolidate {
                space: s,
                fact_ids,
                keep_fact_id,
            } => fact::fact_consolidate(p, s, fact_ids, keep_fact_id),
            Command::FactDelete { space: s, fact_id } => fact::fact_delete(p, s, fact_id),
            Command::FactGet { space: s, fact_id } => fact::fact_get(p, s, fact_id),
            Command::FactHistory { space: s, fact_id } => fact::fact_history(p, s, fact_id),
            Command::FactQueryBySubject {
                space: s,
                subject,
                include_superseded,
            } => fact::fact_query_by_subject(p, s, subject, include_superseded),
            Command::FactQueryByRelationship {
                space: s,
                subject,
                predicate,
                include_superseded,
            } => fact::fact_query_by_relationship(p, s, subject, predicate, include_superseded),
            Command::FactList { space: s, filter } => fact::fact_list(p, s, filter),
            Command::FactCount { space: s, filter } => fact::fact_count(p, s, filter),
            Command::FactSearch {
                space: s,
                query,
                filter,
            } => fact::fact_search(p, s, query, filter),
            Command::FactExport {
                space: s,
                filter,
                format,
            } => fact::fact_export(p, s, filter, format),
            Command::FactPurgeAll => fact::fact_purge_all(p),

            // Contexts
            Command::ContextCreate { input } => context::context_create(p, input),
            Command::ContextUpdate {
                context_id,
                update,
                expected_version,
            } => context::context_update(p, context_id, update, expected_version),
            Command::ContextDelete { context_id, cascade } => {
                context::context_delete(p, context_id, cascade)
            }
            Command::ContextAddParticipant {
                context_id,
                participant_id,
            } => context::context_add_participant(p, context_id, participant_id),
            Command::ContextGrantAccess {
                context_id,
                space: s,
                scope,
            } => context::context_grant_access(p, context_id, s, scope),
            Command::ContextGet { context_id } => context::context_get(p, context_id),
            Command::ContextChain { context_id } => context::context_chain(p, context_id),
            Command::ContextRoot { context_id } => context::context_root(p, context_id),
            Command::ContextChildren {
                context_id,
                recursive,
            } => context::context_children(p, context_id, recursive),
            Command::ContextList { filter } => context::context_list(p, filter),
            Command::ContextCount { filter } => context::context_count(p, filter),
            Command::ContextGetVersion { context_id, version } => {
                context::context_get_version(p, context_id, version)
            }
            Command::ContextHistory { context_id } => context::context_history(p, context_id),
            Command::ContextGetAt {
                context_id,
                timestamp,
            } => context::context_get_at(p, context_id, timestamp),
            Command::ContextPurgeAll => context::context_purge_all(p),

            // Agent-to-agent
            Command::A2aSend {
                from,
                to,
                message,
                options,
            } => a2a::a2a_send(p, from, to, message, options),
            Command::A2aBroadcast {
                from,
                recipients,
                message,
                options,
            } => a2a::a2a_broadcast(p, from, recipients, message, options),
            Command::A2aConversation { a, b } => a2a::a2a_conversation(p, a, b),
        };

        if let Err(e) = &result {
            tracing::debug!(target: "cortex::executor", code = e.code(), error = %e, "command failed");
        }
        result
    }
}
