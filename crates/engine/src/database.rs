//! Database handle
//!
//! `Database` owns the storage tables of every memory layer, the clock, the
//! access mode and the live configuration. Primitive facades
//! (`ConversationStore`, `FactStore`, ...) are stateless and hold an
//! `Arc<Database>`.
//!
//! Central checks live here so every layer applies them the same way:
//! - `require_writable`: read-only databases reject writes
//! - `guard_write`: additionally rejects writes into archived memory spaces
//! - `require_destructive`: "purge all" needs a Dev or Test environment

use std::sync::Arc;

use cortex_core::{Clock, CortexError, CortexResult, MemorySpaceId, Millis, Scope};
use cortex_security::{AccessMode, Environment, OpenOptions};
use cortex_storage::Table;
use parking_lot::RwLock;

use crate::config::{CortexConfig, FactsConfig, LimitsConfig, SearchConfig};
use crate::primitives::context::ContextRecord;
use crate::primitives::conversation::ConversationRecord;
use crate::primitives::fact::FactRecord;
use crate::primitives::immutable::{ImmutableKey, ImmutableRecord};
use crate::primitives::mutable::{MutableKey, MutableRecord};
use crate::primitives::space::{MemorySpace, SpaceStatus};
use crate::primitives::vector::MemoryRecord;

/// Storage tables, one per layer
pub(crate) struct Tables {
    pub conversations: Table<String, ConversationRecord>,
    pub immutable: Table<ImmutableKey, ImmutableRecord>,
    pub mutable: Table<MutableKey, MutableRecord>,
    pub memories: Table<String, MemoryRecord>,
    pub facts: Table<String, FactRecord>,
    pub contexts: Table<String, ContextRecord>,
    /// Registry records, all under `Scope::Global`
    pub spaces: Table<MemorySpaceId, MemorySpace>,
}

impl Tables {
    fn new() -> Self {
        Self {
            conversations: Table::with_global_keys("conversations"),
            immutable: Table::new("immutable"),
            mutable: Table::new("mutable"),
            memories: Table::with_global_keys("memories"),
            facts: Table::with_global_keys("facts"),
            contexts: Table::with_global_keys("contexts"),
            spaces: Table::new("memory_spaces"),
        }
    }
}

/// In-process layered memory database
pub struct Database {
    config: RwLock<CortexConfig>,
    access_mode: AccessMode,
    clock: Clock,
    pub(crate) tables: Tables,
}

impl Database {
    /// Open a database with the given configuration and options
    ///
    /// `options.environment`, when set, overrides `config.environment`.
    pub fn open(config: CortexConfig, options: OpenOptions) -> CortexResult<Arc<Self>> {
        Self::open_with_clock(config, options, Clock::system())
    }

    /// Open a database driven by an explicit clock
    pub fn open_with_clock(
        mut config: CortexConfig,
        options: OpenOptions,
        clock: Clock,
    ) -> CortexResult<Arc<Self>> {
        if let Some(env) = options.environment {
            config.environment = env;
        }
        config.validate()?;

        tracing::info!(
            target: "cortex::engine",
            environment = %config.environment,
            access_mode = ?options.access_mode,
            manual_clock = clock.is_manual(),
            "database opened"
        );

        Ok(Arc::new(Self {
            config: RwLock::new(config),
            access_mode: options.access_mode,
            clock,
            tables: Tables::new(),
        }))
    }

    /// Read-write database with default configuration
    pub fn ephemeral() -> Arc<Self> {
        Arc::new(Self {
            config: RwLock::new(CortexConfig::default()),
            access_mode: AccessMode::ReadWrite,
            clock: Clock::system(),
            tables: Tables::new(),
        })
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Snapshot of the current configuration
    pub fn config(&self) -> CortexConfig {
        self.config.read().clone()
    }

    /// Modify the configuration in place
    ///
    /// The change is validated first; an invalid result leaves the current
    /// configuration untouched.
    pub fn update_config(&self, f: impl FnOnce(&mut CortexConfig)) -> CortexResult<()> {
        let mut guard = self.config.write();
        let mut next = guard.clone();
        f(&mut next);
        next.validate()?;
        *guard = next;
        tracing::info!(target: "cortex::engine", "configuration updated");
        Ok(())
    }

    pub(crate) fn limits(&self) -> LimitsConfig {
        self.config.read().limits
    }

    pub(crate) fn search_config(&self) -> SearchConfig {
        self.config.read().search
    }

    pub(crate) fn facts_config(&self) -> FactsConfig {
        self.config.read().facts
    }

    /// Current deployment environment
    pub fn environment(&self) -> Environment {
        self.config.read().environment
    }

    /// Access mode fixed at open time
    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// The database clock
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Next timestamp, strictly greater than every previous one
    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    // =========================================================================
    // Guards
    // =========================================================================

    /// Reject writes on a read-only database
    pub fn require_writable(&self) -> CortexResult<()> {
        if self.access_mode.allows_writes() {
            Ok(())
        } else {
            Err(CortexError::permission_denied("database is read-only"))
        }
    }

    /// Reject writes on a read-only database or into an archived space
    pub fn guard_write(&self, space: &MemorySpaceId) -> CortexResult<()> {
        self.require_writable()?;
        let archived = self
            .tables
            .spaces
            .get(&Scope::Global, space)
            .map(|s| s.status == SpaceStatus::Archived)
            .unwrap_or(false);
        if archived {
            return Err(CortexError::permission_denied(format!(
                "memory space {} is archived",
                space
            )));
        }
        Ok(())
    }

    /// Reject "purge all" operations outside Dev and Test environments
    pub fn require_destructive(&self, operation: &str) -> CortexResult<()> {
        self.require_writable()?;
        let env = self.environment();
        if env.allows_destructive() {
            tracing::info!(
                target: "cortex::engine",
                operation,
                environment = %env,
                "destructive operation permitted"
            );
            Ok(())
        } else {
            tracing::warn!(
                target: "cortex::engine",
                operation,
                environment = %env,
                "destructive operation refused"
            );
            Err(CortexError::permission_denied(format!(
                "{} requires a dev or test environment, current is {}",
                operation, env
            )))
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("environment", &self.environment())
            .field("access_mode", &self.access_mode)
            .field("conversations", &self.tables.conversations.len())
            .field("memories", &self.tables.memories.len())
            .field("facts", &self.tables.facts.len())
            .finish()
    }
}
