//! Storage substrate errors

use cortex_core::{CortexError, Scope};
use thiserror::Error;

/// Errors raised by `Table` writes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A globally unique key is already owned by another scope
    #[error("key {key} in table {table} is owned by scope {owner}")]
    KeyOwnedElsewhere {
        /// Table name
        table: &'static str,
        /// Debug rendering of the key
        key: String,
        /// Scope currently holding the key
        owner: Scope,
    },
}

impl From<StorageError> for CortexError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::KeyOwnedElsewhere { .. } => {
                CortexError::permission_denied(err.to_string())
            }
        }
    }
}
