//! Database and configuration command handlers.
//!
//! Handles Ping, Info, ConfigGet and ConfigSet.

use std::sync::Arc;

use cortex_engine::{CortexConfig, MemorySpaceFilter};

use crate::bridge::Primitives;
use crate::convert::convert_result;
use crate::types::DatabaseInfo;
use crate::{Error, Output, Result};

/// Handle Ping command.
pub fn ping() -> Result<Output> {
    Ok(Output::Pong {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle Info command.
pub fn info(p: &Arc<Primitives>) -> Result<Output> {
    let memory_spaces = convert_result(p.spaces.count(&MemorySpaceFilter::default()))?;
    Ok(Output::DatabaseInfo(DatabaseInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: p.db.environment(),
        access_mode: p.db.access_mode(),
        memory_spaces,
    }))
}

/// Handle ConfigGet command: return the current database configuration.
pub fn config_get(p: &Arc<Primitives>) -> Result<Output> {
    Ok(Output::Config(p.db.config()))
}

/// Handle ConfigSet command: validate and swap in a new configuration.
///
/// The environment is fixed when the database is opened and cannot be
/// changed through a command.
pub fn config_set(p: &Arc<Primitives>, config: CortexConfig) -> Result<Output> {
    let current = p.db.environment();
    if config.environment != current {
        return Err(Error::PermissionDenied {
            reason: format!(
                "environment is fixed at open time ({}); cannot switch to {}",
                current, config.environment
            ),
        });
    }
    convert_result(p.db.update_config(|cfg| *cfg = config))?;
    Ok(Output::Unit)
}
