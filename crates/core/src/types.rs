//! Identifier and scope types
//!
//! - `MemorySpaceId`: the isolation boundary every record belongs to
//! - `Scope`: where a record lives in storage (a memory space, or global)
//! - `StorageId`: storage-internal identity, distinct from logical ids

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Milliseconds since the Unix epoch
pub type Millis = i64;

/// Tag set attached to records (ordered for deterministic output)
pub type Tags = BTreeSet<String>;

/// Memory space identifier
///
/// The tenant / isolation unit. Every conversation, memory, fact, mutable
/// entry and context is scoped by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemorySpaceId(String);

impl MemorySpaceId {
    /// Create a memory space id
    pub fn new(id: impl Into<String>) -> Self {
        MemorySpaceId(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MemorySpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemorySpaceId {
    fn from(s: &str) -> Self {
        MemorySpaceId(s.to_string())
    }
}

impl From<String> for MemorySpaceId {
    fn from(s: String) -> Self {
        MemorySpaceId(s)
    }
}

impl AsRef<str> for MemorySpaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Storage scope of a record
///
/// Records are scoped to a memory space unless explicitly declared global
/// (unscoped immutable records).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Visible regardless of memory space
    Global,
    /// Scoped to one memory space
    Space(MemorySpaceId),
}

impl Scope {
    /// Scope for an optional memory space (None = global)
    pub fn from_option(space: Option<&MemorySpaceId>) -> Self {
        match space {
            Some(id) => Scope::Space(id.clone()),
            None => Scope::Global,
        }
    }

    /// The memory space, if scoped
    pub fn space(&self) -> Option<&MemorySpaceId> {
        match self {
            Scope::Global => None,
            Scope::Space(id) => Some(id),
        }
    }

    /// True for the global scope
    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

impl From<MemorySpaceId> for Scope {
    fn from(id: MemorySpaceId) -> Self {
        Scope::Space(id)
    }
}

impl From<&MemorySpaceId> for Scope {
    fn from(id: &MemorySpaceId) -> Self {
        Scope::Space(id.clone())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("_global_"),
            Scope::Space(id) => write!(f, "{}", id),
        }
    }
}

/// Storage-internal record identity
///
/// Assigned once at insert and never reused. Logical ids (fact ids, memory
/// ids, `(type, id)` pairs) are what callers address records by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(Uuid);

impl StorageId {
    /// Allocate a fresh storage id
    pub fn new() -> Self {
        StorageId(Uuid::new_v4())
    }

    /// Raw UUID bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for StorageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
