//! Database operations: ping, info and configuration.

use super::Cortex;
use crate::types::DatabaseInfo;
use crate::{Command, Error, Output, Result};
use cortex_engine::CortexConfig;

impl Cortex {
    /// Ping the database.
    pub fn ping(&self) -> Result<String> {
        match self.execute(Command::Ping)? {
            Output::Pong { version } => Ok(version),
            _ => Err(Error::unexpected_output("Ping")),
        }
    }

    /// Get database info.
    pub fn info(&self) -> Result<DatabaseInfo> {
        match self.execute(Command::Info)? {
            Output::DatabaseInfo(info) => Ok(info),
            _ => Err(Error::unexpected_output("Info")),
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> Result<CortexConfig> {
        match self.execute(Command::ConfigGet)? {
            Output::Config(cfg) => Ok(cfg),
            _ => Err(Error::unexpected_output("ConfigGet")),
        }
    }

    /// Replace the configuration.
    ///
    /// The new configuration is validated first and must keep the
    /// environment the database was opened with.
    pub fn set_config(&self, config: CortexConfig) -> Result<()> {
        match self.execute(Command::ConfigSet { config })? {
            Output::Unit => Ok(()),
            _ => Err(Error::unexpected_output("ConfigSet")),
        }
    }
}
