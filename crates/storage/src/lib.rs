//! Storage substrate for the Cortex memory store
//!
//! An embedded, in-process replacement for a hosted document database. Its
//! only job is per-scope atomic read-modify-write:
//! - `Table`: records sharded by `Scope` (memory space or global)
//! - `Shard` / `ShardMut`: consistent read and write views of one scope
//! - `StorageError`: substrate-level failures, converted into `CortexError`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod table;

pub use error::StorageError;
pub use table::{Shard, ShardMut, StoredEntry, Table};
