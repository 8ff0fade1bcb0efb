//! Database handle and memory layer primitives
//!
//! This crate contains:
//! - `database`: the `Database` handle owning every layer's tables
//! - `config`: `CortexConfig`, loaded from TOML or built in code
//! - `primitives`: one stateless facade per memory layer
//! - `search`: tokenization, text matching and result boosting
//! - `validation`: argument checks shared by the primitives

#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod primitives;
pub mod search;
pub mod validation;

pub use config::{CortexConfig, FactsConfig, LimitsConfig, SearchConfig};
pub use database::Database;
pub use primitives::*;
