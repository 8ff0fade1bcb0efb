//! Argument validation shared by the primitives.
//!
//! Every check returns `VALIDATION_ERROR` with a message naming the field.

use cortex_core::{CortexError, CortexResult, JsonValue, MemorySpaceId, Tags};

use crate::config::LimitsConfig;

/// Separator reserved in composite keys.
const SEP: char = '/';

// =============================================================================
// Identifiers
// =============================================================================

/// Validate a caller-supplied identifier.
pub fn validate_id(field: &str, id: &str, limits: &LimitsConfig) -> CortexResult<()> {
    if id.trim().is_empty() {
        return Err(CortexError::invalid_input(format!(
            "{} must not be empty",
            field
        )));
    }
    if id.len() > limits.max_id_bytes {
        return Err(CortexError::invalid_input(format!(
            "{} exceeds {} bytes",
            field, limits.max_id_bytes
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(CortexError::invalid_input(format!(
            "{} must not contain control characters",
            field
        )));
    }
    Ok(())
}

/// Validate a memory space id.
pub fn validate_space(space: &MemorySpaceId, limits: &LimitsConfig) -> CortexResult<()> {
    validate_id("memory_space_id", space.as_str(), limits)
}

/// Validate a namespace or record type (no `/`).
pub fn validate_segment(field: &str, value: &str, limits: &LimitsConfig) -> CortexResult<()> {
    validate_id(field, value, limits)?;
    if value.contains(SEP) {
        return Err(CortexError::invalid_input(format!(
            "{} must not contain '/'",
            field
        )));
    }
    Ok(())
}

// =============================================================================
// Content
// =============================================================================

/// Validate non-empty text content within a byte budget.
pub fn validate_content(field: &str, content: &str, max_bytes: usize) -> CortexResult<()> {
    if content.trim().is_empty() {
        return Err(CortexError::invalid_input(format!(
            "{} must not be empty",
            field
        )));
    }
    validate_len(field, content, max_bytes)
}

/// Validate text length only (empty allowed).
pub fn validate_len(field: &str, content: &str, max_bytes: usize) -> CortexResult<()> {
    if content.len() > max_bytes {
        return Err(CortexError::invalid_input(format!(
            "{} is {} bytes, limit is {}",
            field,
            content.len(),
            max_bytes
        )));
    }
    Ok(())
}

/// Validate an opaque JSON payload's encoded size.
pub fn validate_payload(field: &str, value: &JsonValue, limits: &LimitsConfig) -> CortexResult<()> {
    let size = value.size_bytes();
    if size > limits.max_payload_bytes {
        return Err(CortexError::invalid_input(format!(
            "{} is {} bytes, limit is {}",
            field, size, limits.max_payload_bytes
        )));
    }
    Ok(())
}

/// Validate a tag set.
pub fn validate_tags(tags: &Tags, limits: &LimitsConfig) -> CortexResult<()> {
    if tags.len() > limits.max_tags {
        return Err(CortexError::invalid_input(format!(
            "{} tags given, limit is {}",
            tags.len(),
            limits.max_tags
        )));
    }
    if tags.iter().any(|t| t.trim().is_empty()) {
        return Err(CortexError::invalid_input("tags must not be empty strings"));
    }
    Ok(())
}

// =============================================================================
// Scores
// =============================================================================

/// Validate a 0..=100 score (importance, confidence).
pub fn validate_percent(field: &str, value: u8) -> CortexResult<()> {
    if value > 100 {
        return Err(CortexError::invalid_input(format!(
            "{} must be between 0 and 100, got {}",
            field, value
        )));
    }
    Ok(())
}

/// Validate an embedding's dimensionality.
///
/// Non-finite components are accepted; search excludes them from ranking.
pub fn validate_embedding(embedding: &[f32], limits: &LimitsConfig) -> CortexResult<()> {
    if embedding.is_empty() {
        return Err(CortexError::invalid_input("embedding must not be empty"));
    }
    if embedding.len() > limits.max_embedding_dimensions {
        return Err(CortexError::invalid_input(format!(
            "embedding has {} dimensions, limit is {}",
            embedding.len(),
            limits.max_embedding_dimensions
        )));
    }
    Ok(())
}

/// Validate a `keep_latest` version budget.
pub fn validate_keep_latest(keep_latest: usize) -> CortexResult<()> {
    if keep_latest < 1 {
        return Err(CortexError::invalid_input(
            "keep_latest must be at least 1 (the current version)",
        ));
    }
    Ok(())
}
