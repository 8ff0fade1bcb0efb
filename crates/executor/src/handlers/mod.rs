//! Command handlers, one module per memory layer.
//!
//! Each handler unpacks its command's fields, calls one engine facade
//! through `bridge::Primitives` and wraps the result in an `Output`.

pub mod a2a;
pub mod config;
pub mod context;
pub mod conversation;
pub mod fact;
pub mod immutable;
pub mod memory;
pub mod mutable;
pub mod space;
