//! Partial memories for streamed content

use cortex_core::{CortexError, CortexResult, JsonValue, MemorySpaceId, Metadata, Scope, Tags};

use super::types::{MemoryRecord, StoreMemory, PARTIAL_TAG, STREAMING_TAG};
use super::MemoryStore;
use crate::validation;

impl MemoryStore {
    fn not_partial(memory_id: &str) -> CortexError {
        CortexError::invalid_input(format!("memory {} is not a partial memory", memory_id))
    }

    /// Start a streamed memory
    ///
    /// Content may be empty at this point. The memory is tagged `streaming`
    /// and `partial` until it is finalized. Tags the caller already set are
    /// left alone on finalize.
    pub fn store_partial(&self, space: &MemorySpaceId, mut input: StoreMemory) -> CortexResult<MemoryRecord> {
        self.db.guard_write(space)?;
        let mut added = Tags::new();
        for tag in [STREAMING_TAG, PARTIAL_TAG] {
            if input.tags.insert(tag.to_string()) {
                added.insert(tag.to_string());
            }
        }
        self.validate_input(space, &input, true)?;
        let now = self.db.now();
        let record = self.insert_new(space, input, Some(added), now)?;

        tracing::debug!(
            target: "cortex::memory",
            memory_space = %space,
            memory_id = %record.memory_id,
            "partial memory started"
        );
        Ok(record)
    }

    /// Replace a streamed memory's content with what has arrived so far
    ///
    /// No version is created.
    pub fn update_partial(
        &self,
        space: &MemorySpaceId,
        memory_id: &str,
        content: impl Into<String>,
        metadata: Option<Metadata>,
    ) -> CortexResult<MemoryRecord> {
        self.db.guard_write(space)?;
        let content = content.into();
        let limits = self.db.limits();
        validation::validate_len("content", &content, limits.max_content_bytes)?;
        if let Some(metadata) = &metadata {
            validation::validate_payload("metadata", &JsonValue::from(metadata.clone()), &limits)?;
        }

        let now = self.db.now();
        let key = memory_id.to_string();
        let record = self
            .db
            .tables
            .memories
            .with_shard_mut(&Scope::from(space), |shard| {
                let partial = shard
                    .get(&key)
                    .map(|m| m.is_partial)
                    .ok_or_else(|| Self::missing(space, memory_id, shard.owner(&key)))?;
                if !partial {
                    return Err(Self::not_partial(memory_id));
                }
                shard
                    .update(&key, |m| {
                        m.content = content;
                        if metadata.is_some() {
                            m.metadata = metadata;
                        }
                        m.updated_at = now;
                        m.clone()
                    })
                    .ok_or_else(|| Self::not_found(space, memory_id))
            })?;

        tracing::debug!(
            target: "cortex::memory",
            memory_space = %space,
            memory_id,
            bytes = record.content.len(),
            "partial memory updated"
        );
        Ok(record)
    }

    /// Finish a streamed memory
    ///
    /// Sets the final content and embedding when given, clears `is_partial`
    /// and removes the tags `store_partial` added. The memory stays at its
    /// current version and becomes visible to search.
    pub fn finalize_partial(
        &self,
        space: &MemorySpaceId,
        memory_id: &str,
        content: Option<String>,
        embedding: Option<Vec<f32>>,
    ) -> CortexResult<MemoryRecord> {
        self.db.guard_write(space)?;
        let limits = self.db.limits();
        if let Some(embedding) = &embedding {
            validation::validate_embedding(embedding, &limits)?;
        }

        let now = self.db.now();
        let key = memory_id.to_string();
        let record = self
            .db
            .tables
            .memories
            .with_shard_mut(&Scope::from(space), |shard| {
                let current = shard
                    .get(&key)
                    .ok_or_else(|| Self::missing(space, memory_id, shard.owner(&key)))?;
                if !current.is_partial {
                    return Err(Self::not_partial(memory_id));
                }
                let final_content = content.unwrap_or_else(|| current.content.clone());
                validation::validate_content("content", &final_content, limits.max_content_bytes)?;
                shard
                    .update(&key, |m| {
                        m.content = final_content;
                        if embedding.is_some() {
                            m.embedding = embedding;
                        }
                        m.is_partial = false;
                        for tag in std::mem::take(&mut m.streaming_tags) {
                            m.tags.remove(&tag);
                        }
                        m.updated_at = now;
                        m.clone()
                    })
                    .ok_or_else(|| Self::not_found(space, memory_id))
            })?;

        tracing::debug!(
            target: "cortex::memory",
            memory_space = %space,
            memory_id,
            "partial memory finalized"
        );
        Ok(record)
    }
}
