//! Shared helpers for the comprehensive suite

use std::sync::Once;

use cortex_engine::Database;
use cortexdb::{
    AccessMode, Clock, Command, Cortex, CortexConfig, Environment, MemorySpaceId, Millis,
    OpenOptions, Output,
};

static TRACING: Once = Once::new();

/// Route engine logs to the test harness; `--nocapture` shows them
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// A store opened in the test environment
pub fn test_store() -> Cortex {
    open(Environment::Test, AccessMode::ReadWrite)
}

/// A store opened in production, where destructive operations are refused
pub fn production_store() -> Cortex {
    open(Environment::Production, AccessMode::ReadWrite)
}

pub fn open(environment: Environment, mode: AccessMode) -> Cortex {
    init_tracing();
    Cortex::open(
        CortexConfig::for_environment(environment),
        OpenOptions::new().environment(environment).access_mode(mode),
    )
    .expect("store should open")
}

/// A test store on a manual clock starting at `start`
pub fn manual_clock_store(start: Millis) -> Cortex {
    init_tracing();
    let db = Database::open_with_clock(
        CortexConfig::for_environment(Environment::Test),
        OpenOptions::new().environment(Environment::Test),
        Clock::manual(start),
    )
    .expect("store should open");
    Cortex::from_database(db)
}

/// The clock behind a store
pub fn clock(db: &Cortex) -> &Clock {
    db.executor().database().clock()
}

pub fn space(id: &str) -> MemorySpaceId {
    MemorySpaceId::from(id)
}

/// Execute a command that must succeed
pub fn run(db: &Cortex, command: Command) -> Output {
    match db.execute(command.clone()) {
        Ok(output) => output,
        Err(e) => panic!("{:?} failed: {}", command, e),
    }
}

/// Execute a command that returns a count
pub fn count(db: &Cortex, command: Command) -> usize {
    match run(db, command) {
        Output::Count(n) => n,
        other => panic!("Expected Count, got {:?}", other),
    }
}
