//! Layered Memory Comprehensive Test Suite
//!
//! Exercises the store end to end through the public `cortexdb` API.
//!
//! ## Test Tiers
//!
//! - **Tier 1**: Memory space isolation across every layer
//! - **Tier 2**: Version chains and point-in-time reads
//! - **Tier 3**: Cross-layer references, cascades and agent messaging
//! - **Tier 4**: Environment, access mode and lifecycle guards
//! - **Tier 5**: Property-based invariants
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test layered_memory_comprehensive
//! ```

// Test modules
mod test_utils;

// Tier 1: Isolation
mod tier1_space_isolation;

// Tier 2: Versioning
mod tier2_version_chains;

// Tier 3: Cross-layer behavior
mod tier3_cross_layer;

// Tier 4: Guards
mod tier4_guards;

// Tier 5: Properties
mod tier5_properties;
