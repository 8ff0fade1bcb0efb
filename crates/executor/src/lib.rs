//! Command execution layer for the Cortex memory store
//!
//! Every operation of every memory layer is expressed as a [`Command`]
//! value and answered with an [`Output`] value. Both are plain serde enums,
//! so a host process or SDK can drive the store from JSON:
//!
//! ```text
//! {"command": "memory_store", "space": "team-a", "input": {"content": "hello"}}
//! ```
//!
//! - `command`: the `Command` enum
//! - `output`: the `Output` enum
//! - `executor`: dispatch of commands to handlers
//! - `handlers`: one module per memory layer
//! - `bridge`: the engine facades a handler can reach
//! - `api`: typed convenience methods over `Executor` (`Cortex`)
//! - `error` / `convert`: the wire-level error type and its mapping from
//!   `CortexError`

#![warn(clippy::all)]

mod api;
mod bridge;
mod command;
mod convert;
mod error;
mod executor;
mod handlers;
mod output;
mod types;

pub use api::{Cortex, Spaces};
pub use command::Command;
pub use error::{Error, Result};
pub use executor::Executor;
pub use output::Output;
pub use types::DatabaseInfo;
