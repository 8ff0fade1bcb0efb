//! CortexDB: a layered, versioned memory store for AI agents.
//!
//! Every record lives inside a memory space. The layers are:
//!
//! - conversations: append-only message logs between users and agents
//! - immutable records: versioned documents that are never edited in place
//! - mutable entries: namespaced key/value state with atomic updates
//! - memories: searchable content with optional embeddings
//! - facts: structured knowledge with supersession chains
//! - contexts: hierarchical work contexts shared across spaces
//!
//! Open a store with [`Cortex::open`] or [`Cortex::open_file`] and drive it
//! with typed methods or with [`Command`] values.
//!
//! ```text
//! use cortexdb::*;
//!
//! let db = Cortex::open(CortexConfig::default(), OpenOptions::new())?;
//! let space = MemorySpaceId::from("user-1-personal");
//! db.remember(&space, StoreMemory::new("prefers dark mode"))?;
//! let hits = db.recall(&space, MemorySearch::new("dark mode"))?;
//! ```

#![warn(clippy::all)]

mod types;

pub use types::*;

pub use cortex_executor::{Command, Cortex, DatabaseInfo, Error, Executor, Output, Result, Spaces};
