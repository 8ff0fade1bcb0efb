//! Executor error type
//!
//! Errors cross the command boundary as data: every variant serializes with
//! a `code` tag matching the engine's `ErrorCode` taxonomy, plus fields a
//! caller can act on without parsing the message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for executor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Executor::execute`](crate::Executor::execute)
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum Error {
    // ==================== Not found ====================
    #[error("memory space not found: {space}")]
    SpaceNotFound { space: String },

    #[error("participant not found: {participant}")]
    ParticipantNotFound { participant: String },

    #[error("conversation not found: {conversation}")]
    ConversationNotFound { conversation: String },

    #[error("message not found: {message}")]
    MessageNotFound { message: String },

    #[error("record not found: {record}")]
    RecordNotFound { record: String },

    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    #[error("memory not found: {memory}")]
    MemoryNotFound { memory: String },

    #[error("fact not found: {fact}")]
    FactNotFound { fact: String },

    #[error("context not found: {context}")]
    ContextNotFound { context: String },

    // ==================== Write rejections ====================
    #[error("already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("version conflict on {entity}: expected {expected}, actual {actual}")]
    VersionConflict {
        entity: String,
        expected: u64,
        actual: u64,
    },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    // ==================== Bad input ====================
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("wrong type: expected {expected}, got {actual}")]
    WrongType { expected: String, actual: String },

    #[error("constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    // ==================== System ====================
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl Error {
    /// Stable wire code, aligned with the engine's `ErrorCode`
    pub fn code(&self) -> &'static str {
        match self {
            Error::SpaceNotFound { .. }
            | Error::ParticipantNotFound { .. }
            | Error::ConversationNotFound { .. }
            | Error::MessageNotFound { .. }
            | Error::RecordNotFound { .. }
            | Error::KeyNotFound { .. }
            | Error::MemoryNotFound { .. }
            | Error::FactNotFound { .. }
            | Error::ContextNotFound { .. } => "NOT_FOUND",
            Error::AlreadyExists { .. } => "ALREADY_EXISTS",
            Error::PermissionDenied { .. } => "PERMISSION_DENIED",
            Error::VersionConflict { .. } => "VERSION_CONFLICT",
            Error::Conflict { .. } => "CONFLICT",
            Error::InvalidInput { .. } => "VALIDATION_ERROR",
            Error::WrongType { .. } => "TYPE_MISMATCH",
            Error::ConstraintViolation { .. } => "STRUCTURAL_ERROR",
            Error::Serialization { .. } => "SERIALIZATION",
            Error::Internal { .. } => "INTERNAL",
        }
    }

    /// True for every not-found variant
    pub fn is_not_found(&self) -> bool {
        self.code() == "NOT_FOUND"
    }

    pub(crate) fn unexpected_output(command: &str) -> Self {
        Error::Internal {
            reason: format!("Unexpected output for {}", command),
        }
    }
}
