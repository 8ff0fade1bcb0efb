//! Embedded version history
//!
//! Shared by immutable records, vector memories and contexts: the identity is
//! stable and prior values are kept in an append-only list inside the record.
//!
//! Invariants:
//! - `version` starts at 1 and increases by exactly 1 per update
//! - `previous_versions` is append-only and ordered oldest first
//! - the current value never appears in `previous_versions`
//! - a snapshot's `timestamp` is the `updated_at` of the value it captured,
//!   so timestamps are strictly increasing
//!
//! Fact belief revision is a different structure (linked identities, see
//! `fact::chain`) and does not use this module.

use cortex_core::{CortexError, CortexResult, Metadata, Millis};
use serde::{Deserialize, Serialize};

/// A prior value of a versioned record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot<S> {
    /// Version this value had
    pub version: u64,
    /// The value
    pub data: S,
    /// When this value became current
    pub timestamp: Millis,
    /// Metadata attached at the time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Current version number plus prior values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionHistory<S> {
    /// Current version
    pub version: u64,
    /// Prior values, oldest first
    pub previous_versions: Vec<VersionSnapshot<S>>,
}

impl<S> Default for VersionHistory<S> {
    fn default() -> Self {
        Self {
            version: 1,
            previous_versions: Vec::new(),
        }
    }
}

impl<S: Clone> VersionHistory<S> {
    /// Archive the current value and move to the next version
    ///
    /// # Arguments
    ///
    /// * `current` - Value being replaced
    /// * `current_since` - `updated_at` of the value being replaced
    /// * `metadata` - Metadata to keep with the snapshot
    ///
    /// # Returns
    ///
    /// The new version number
    pub fn advance(&mut self, current: S, current_since: Millis, metadata: Option<Metadata>) -> u64 {
        self.previous_versions.push(VersionSnapshot {
            version: self.version,
            data: current,
            timestamp: current_since,
            metadata,
        });
        self.version += 1;
        self.version
    }

    /// Prior snapshot with the given version
    pub fn find(&self, version: u64) -> Option<&VersionSnapshot<S>> {
        self.previous_versions.iter().find(|s| s.version == version)
    }

    /// Latest prior snapshot that was already current at `t`
    pub fn latest_at(&self, t: Millis) -> Option<&VersionSnapshot<S>> {
        self.previous_versions
            .iter()
            .rev()
            .find(|s| s.timestamp <= t)
    }

    /// Keep at most `keep_latest` versions, counting the current one
    ///
    /// # Returns
    ///
    /// Number of snapshots removed (0 if already within budget)
    pub fn purge(&mut self, keep_latest: usize) -> CortexResult<usize> {
        if keep_latest < 1 {
            return Err(CortexError::invalid_input(
                "keep_latest must be at least 1 (the current version)",
            ));
        }
        let keep_snapshots = keep_latest - 1;
        let excess = self.previous_versions.len().saturating_sub(keep_snapshots);
        self.previous_versions.drain(..excess);
        Ok(excess)
    }

    /// Number of versions retained, including the current one
    pub fn retained(&self) -> usize {
        self.previous_versions.len() + 1
    }
}

/// A record with embedded version history
///
/// Implementors describe how to snapshot their current value and how to
/// rebuild a view of themselves from a snapshot. The provided methods give
/// every versioned layer the same point-in-time semantics.
pub trait Versioned: Clone {
    /// The part of the record that is versioned
    type Snapshot: Clone;

    /// The version history
    fn history(&self) -> &VersionHistory<Self::Snapshot>;

    /// Mutable version history
    fn history_mut(&mut self) -> &mut VersionHistory<Self::Snapshot>;

    /// Snapshot of the current value
    fn snapshot(&self) -> Self::Snapshot;

    /// Replace the versioned part with a snapshot's data
    fn apply_snapshot(&mut self, data: &Self::Snapshot);

    /// When the record was created
    fn created_at(&self) -> Millis;

    /// When the current value became current
    fn updated_at(&self) -> Millis;

    /// Set `updated_at`
    fn set_updated_at(&mut self, t: Millis);

    /// Metadata to store with a snapshot of the current value
    fn snapshot_metadata(&self) -> Option<Metadata> {
        None
    }

    /// Current version number
    fn version(&self) -> u64 {
        self.history().version
    }

    /// Archive the current value, then apply `change` as the next version
    fn commit_version(&mut self, now: Millis, change: impl FnOnce(&mut Self)) -> u64 {
        let snapshot = self.snapshot();
        let since = self.updated_at();
        let metadata = self.snapshot_metadata();
        let version = self.history_mut().advance(snapshot, since, metadata);
        change(self);
        self.set_updated_at(now);
        version
    }

    /// The record as it was at a version
    ///
    /// Returns None if the version never existed or was purged.
    fn at_version(&self, version: u64) -> Option<Self> {
        if version == self.version() {
            return Some(self.clone());
        }
        self.history().find(version).map(|s| self.view_of(s))
    }

    /// The record as it was at time `t`
    ///
    /// Returns the current record if it was already current at `t`, otherwise
    /// the latest snapshot current at `t`. Version 1 covers everything from
    /// `created_at` onward, even when writes that keep the version (streamed
    /// content, structural changes) moved its `updated_at` later. Returns
    /// None if `t` precedes creation or the version live at `t` was purged.
    fn at_timestamp(&self, t: Millis) -> Option<Self> {
        if t < self.created_at() {
            return None;
        }
        if self.updated_at() <= t {
            return Some(self.clone());
        }
        if let Some(snap) = self.history().latest_at(t) {
            return Some(self.view_of(snap));
        }
        match self.history().previous_versions.first() {
            Some(first) if first.version == 1 => Some(self.view_of(first)),
            None if self.version() == 1 => Some(self.clone()),
            _ => None,
        }
    }

    /// Every retained version, oldest first, current last
    fn all_versions(&self) -> Vec<Self> {
        let mut out: Vec<Self> = self
            .history()
            .previous_versions
            .iter()
            .map(|s| self.view_of(s))
            .collect();
        out.push(self.clone());
        out
    }

    /// A copy of this record showing a snapshot's value
    ///
    /// The copy's history is truncated to what preceded the snapshot.
    fn view_of(&self, snap: &VersionSnapshot<Self::Snapshot>) -> Self {
        let mut view = self.clone();
        view.apply_snapshot(&snap.data);
        view.set_updated_at(snap.timestamp);
        let history = view.history_mut();
        history.version = snap.version;
        history.previous_versions.retain(|s| s.version < snap.version);
        view
    }
}

/// Outcome of purging old versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeVersionsResult {
    /// Snapshots removed
    pub versions_purged: usize,
    /// Versions retained, including the current one
    pub versions_remaining: usize,
}
