//! Error taxonomy for the memory store
//!
//! Every operation returns `CortexResult<T>`. Each error variant maps to a
//! stable `ErrorCode` that callers can match on without parsing messages.
//!
//! | Condition | Code |
//! |-----------|------|
//! | Operating on a missing key | `NOT_FOUND` |
//! | Duplicate creation | `ALREADY_EXISTS` |
//! | Memory space ownership mismatch on a write | `PERMISSION_DENIED` |
//! | Malformed arguments, size limits, out-of-range scores | `VALIDATION_ERROR` |
//! | Operator applied to the wrong value shape | `TYPE_MISMATCH` |
//! | Broken structure (cycles, keep id outside merge set) | `STRUCTURAL_ERROR` |
//! | Stale expected version on compare-and-swap | `VERSION_CONFLICT` |
//! | Transaction read-set invalidated by a concurrent writer | `CONFLICT` |
//!
//! Errors are local to one operation. Nothing is retried automatically.

use crate::entity_ref::EntityRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the workspace
pub type CortexResult<T> = std::result::Result<T, CortexError>;

/// Stable, machine-readable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Operating on a missing key
    NotFound,
    /// Duplicate creation
    AlreadyExists,
    /// Memory space / tenant ownership mismatch
    PermissionDenied,
    /// Malformed arguments
    ValidationError,
    /// Value has the wrong shape for the requested operation
    TypeMismatch,
    /// Structural invariant violated (cycles, merge-set membership)
    StructuralError,
    /// Compare-and-swap failed
    VersionConflict,
    /// Optimistic transaction lost a race
    Conflict,
    /// Payload could not be encoded or decoded
    Serialization,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::StructuralError => "STRUCTURAL_ERROR",
            ErrorCode::VersionConflict => "VERSION_CONFLICT",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Serialization => "SERIALIZATION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by memory store operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CortexError {
    /// The addressed record does not exist
    #[error("not found: {entity_ref}")]
    NotFound {
        /// The missing record
        entity_ref: EntityRef,
    },

    /// A record with the same identity already exists
    #[error("already exists: {entity_ref}")]
    AlreadyExists {
        /// The conflicting record
        entity_ref: EntityRef,
    },

    /// The caller does not own the record, or the target is read-only
    #[error("permission denied: {reason}")]
    PermissionDenied {
        /// Why access was refused
        reason: String,
    },

    /// Arguments failed validation
    #[error("validation error: {message}")]
    Validation {
        /// Description of the invalid input
        message: String,
    },

    /// Operation applied to a value of the wrong shape
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected value type
        expected: String,
        /// Actual value type
        actual: String,
    },

    /// A structural invariant would be violated
    #[error("structural error: {reason}")]
    Structural {
        /// Which invariant and where
        reason: String,
    },

    /// Compare-and-swap on a version failed
    #[error("version conflict on {entity_ref}: expected {expected}, actual {actual}")]
    VersionConflict {
        /// The record whose version moved
        entity_ref: EntityRef,
        /// Version the caller expected
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Transaction validation failed
    #[error("conflict: {reason}")]
    Conflict {
        /// Description of the conflicting keys
        reason: String,
    },

    /// Payload encoding or decoding failed
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying serializer message
        message: String,
    },
}

impl CortexError {
    /// Create a NotFound error
    pub fn not_found(entity_ref: EntityRef) -> Self {
        CortexError::NotFound { entity_ref }
    }

    /// Create an AlreadyExists error
    pub fn already_exists(entity_ref: EntityRef) -> Self {
        CortexError::AlreadyExists { entity_ref }
    }

    /// Create a PermissionDenied error
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        CortexError::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CortexError::Validation {
            message: message.into(),
        }
    }

    /// Create a TypeMismatch error
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        CortexError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a Structural error
    pub fn structural(reason: impl Into<String>) -> Self {
        CortexError::Structural {
            reason: reason.into(),
        }
    }

    /// Create a VersionConflict error
    pub fn version_conflict(entity_ref: EntityRef, expected: u64, actual: u64) -> Self {
        CortexError::VersionConflict {
            entity_ref,
            expected,
            actual,
        }
    }

    /// Create a Conflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        CortexError::Conflict {
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        CortexError::Serialization {
            message: message.into(),
        }
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CortexError::NotFound { .. } => ErrorCode::NotFound,
            CortexError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            CortexError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            CortexError::Validation { .. } => ErrorCode::ValidationError,
            CortexError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            CortexError::Structural { .. } => ErrorCode::StructuralError,
            CortexError::VersionConflict { .. } => ErrorCode::VersionConflict,
            CortexError::Conflict { .. } => ErrorCode::Conflict,
            CortexError::Serialization { .. } => ErrorCode::Serialization,
        }
    }

    /// True for NOT_FOUND
    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }

    /// True for CONFLICT and VERSION_CONFLICT
    pub fn is_conflict(&self) -> bool {
        matches!(self.code(), ErrorCode::Conflict | ErrorCode::VersionConflict)
    }
}

impl From<serde_json::Error> for CortexError {
    fn from(err: serde_json::Error) -> Self {
        CortexError::serialization(err.to_string())
    }
}
