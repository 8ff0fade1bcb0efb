//! Typed API over the executor.
//!
//! `Cortex` wraps an [`Executor`] and turns the most common commands into
//! plain method calls with typed results. Everything else is one
//! `execute` away.
//!
//! ```text
//! use cortex_executor::Cortex;
//!
//! let db = Cortex::open_file("cortex.toml")?;
//! db.spaces().register(RegisterMemorySpace::new("team-a", SpaceType::Team))?;
//! let memory = db.remember(&"team-a".into(), StoreMemory::new("likes tea"))?;
//! let hits = db.recall(&"team-a".into(), MemorySearch::new("tea"))?;
//! ```

mod db;
mod memory;
mod spaces;

use std::path::Path;
use std::sync::Arc;

use cortex_engine::{CortexConfig, Database};
use cortex_security::OpenOptions;

use crate::convert::convert_result;
use crate::{Command, Executor, Output, Result};

pub use spaces::Spaces;

/// Handle to an open memory store
#[derive(Clone)]
pub struct Cortex {
    executor: Executor,
}

impl Cortex {
    /// Open a store with an explicit configuration
    pub fn open(config: CortexConfig, options: OpenOptions) -> Result<Self> {
        let db = convert_result(Database::open(config, options))?;
        Ok(Self::from_database(db))
    }

    /// Open a store configured by a TOML file
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = convert_result(CortexConfig::load(path))?;
        Self::open(config, OpenOptions::new())
    }

    /// Wrap an already open database
    pub fn from_database(db: Arc<Database>) -> Self {
        Self {
            executor: Executor::new(db),
        }
    }

    /// The command executor
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Execute any command
    pub fn execute(&self, command: Command) -> Result<Output> {
        self.executor.execute(command)
    }

    /// Memory space management
    pub fn spaces(&self) -> Spaces<'_> {
        Spaces::new(&self.executor)
    }
}
