//! Access control for the Cortex memory store.
//!
//! This crate provides the [`AccessMode`], [`Environment`] and [`OpenOptions`]
//! types used to control how a database is opened and which operations it
//! permits.
//!
//! Destructive maintenance operations (purging every record of a layer) are
//! gated on the [`Environment`] given at open time, never on anything
//! inferred at runtime.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Controls whether the database allows writes or is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Allow both reads and writes (default).
    #[default]
    ReadWrite,
    /// Read-only mode. All write operations are rejected.
    ReadOnly,
}

impl AccessMode {
    /// True if writes are permitted.
    pub fn allows_writes(&self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }
}

/// Deployment environment the store runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Live deployment (default). Destructive operations are refused.
    #[default]
    Production,
    /// Pre-production deployment. Destructive operations are refused.
    Staging,
    /// Local development.
    Dev,
    /// Automated tests.
    Test,
}

impl Environment {
    /// True if "purge all" style operations may run.
    pub fn allows_destructive(&self) -> bool {
        matches!(self, Environment::Dev | Environment::Test)
    }

    /// Lowercase name of the environment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Dev => "dev",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown environment name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown environment: {0}")]
pub struct ParseEnvironmentError(pub String);

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "dev" | "development" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            other => Err(ParseEnvironmentError(other.to_string())),
        }
    }
}

/// Options for opening a database.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use cortex_security::{AccessMode, Environment, OpenOptions};
///
/// let opts = OpenOptions::new()
///     .access_mode(AccessMode::ReadOnly)
///     .environment(Environment::Test);
/// assert!(!opts.access_mode.allows_writes());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// The access mode for the database.
    pub access_mode: AccessMode,
    /// Environment override. When `None` the configured environment applies.
    pub environment: Option<Environment>,
}

impl OpenOptions {
    /// Create a new `OpenOptions` with default settings (read-write mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the access mode for the database.
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Set the deployment environment.
    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = Some(env);
        self
    }
}
