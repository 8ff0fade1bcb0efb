//! Core types for the Cortex layered memory store
//!
//! This crate defines the vocabulary shared by every other crate:
//! - `error`: The error taxonomy (`CortexError`, `ErrorCode`)
//! - `types`: Memory space identifiers, scopes and storage ids
//! - `entity_ref`: Universal addressing of records across layers
//! - `json`: Opaque JSON payloads (`JsonValue`, `Metadata`)
//! - `clock`: Monotonic millisecond clock
//! - `ids`: Creation-time sortable identifier generation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod entity_ref;
pub mod error;
pub mod ids;
pub mod json;
pub mod types;

pub use clock::Clock;
pub use entity_ref::EntityRef;
pub use error::{CortexError, CortexResult, ErrorCode};
pub use ids::{generate_id, id_timestamp};
pub use json::{JsonValue, Metadata, NumericValue};
pub use types::{MemorySpaceId, Millis, Scope, StorageId, Tags};
