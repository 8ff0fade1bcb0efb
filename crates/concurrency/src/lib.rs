//! Optimistic concurrency control for the Cortex memory store
//!
//! Multi-key batches are staged on a private overlay, then validated and
//! applied in one step under the scope's lock:
//! - `TransactionContext`: read-set tracking and staged writes
//! - `validation`: first-committer-wins conflict detection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod transaction;
pub mod validation;

pub use transaction::{CommitSummary, TransactionContext};
pub use validation::{validate_read_set, ConflictType, ValidationResult};
