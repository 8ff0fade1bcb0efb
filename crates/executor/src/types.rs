//! Types that only exist at the command boundary

use cortex_security::{AccessMode, Environment};
use serde::{Deserialize, Serialize};

/// Summary returned by the `Info` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Crate version of the executor
    pub version: String,
    pub environment: Environment,
    pub access_mode: AccessMode,
    /// Registered memory spaces
    pub memory_spaces: usize,
}
