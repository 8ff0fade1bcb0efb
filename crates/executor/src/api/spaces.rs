//! Memory space management API.
//!
//! Access via `db.spaces()`:
//!
//! ```text
//! db.spaces().register(RegisterMemorySpace::new("team-a", SpaceType::Team))?;
//! db.spaces().archive(&"team-a".into())?;
//! let report = db.spaces().delete(&"team-a".into(), true)?;
//! ```

use cortex_core::MemorySpaceId;
use cortex_engine::{
    CascadeReport, MemorySpace, MemorySpaceFilter, MemorySpaceStats, NewParticipant,
    RegisterMemorySpace,
};

use crate::{Command, Error, Executor, Output, Result};

/// Handle for memory space operations.
///
/// Obtained via [`Cortex::spaces()`](super::Cortex::spaces).
pub struct Spaces<'a> {
    executor: &'a Executor,
}

impl<'a> Spaces<'a> {
    pub(crate) fn new(executor: &'a Executor) -> Self {
        Self { executor }
    }

    /// Register a new memory space.
    pub fn register(&self, input: RegisterMemorySpace) -> Result<MemorySpace> {
        match self.executor.execute(Command::SpaceRegister { input })? {
            Output::Space(space) => Ok(space),
            _ => Err(Error::unexpected_output("SpaceRegister")),
        }
    }

    /// Get a memory space, if registered.
    pub fn get(&self, space: &MemorySpaceId) -> Result<Option<MemorySpace>> {
        match self.executor.execute(Command::SpaceGet {
            space: space.clone(),
        })? {
            Output::MaybeSpace(space) => Ok(space),
            _ => Err(Error::unexpected_output("SpaceGet")),
        }
    }

    /// List memory spaces, oldest first.
    pub fn list(&self, filter: MemorySpaceFilter) -> Result<Vec<MemorySpace>> {
        match self.executor.execute(Command::SpaceList { filter })? {
            Output::Spaces(spaces) => Ok(spaces),
            _ => Err(Error::unexpected_output("SpaceList")),
        }
    }

    /// Add a participant; adding an existing one is a no-op.
    pub fn add_participant(
        &self,
        space: &MemorySpaceId,
        id: &str,
        participant_type: &str,
    ) -> Result<MemorySpace> {
        match self.executor.execute(Command::SpaceAddParticipant {
            space: space.clone(),
            participant: NewParticipant::new(id, participant_type),
        })? {
            Output::Space(space) => Ok(space),
            _ => Err(Error::unexpected_output("SpaceAddParticipant")),
        }
    }

    /// Archive a space; its records stay readable but reject writes.
    pub fn archive(&self, space: &MemorySpaceId) -> Result<MemorySpace> {
        match self.executor.execute(Command::SpaceArchive {
            space: space.clone(),
        })? {
            Output::Space(space) => Ok(space),
            _ => Err(Error::unexpected_output("SpaceArchive")),
        }
    }

    /// Reactivate an archived space.
    pub fn reactivate(&self, space: &MemorySpaceId) -> Result<MemorySpace> {
        match self.executor.execute(Command::SpaceReactivate {
            space: space.clone(),
        })? {
            Output::Space(space) => Ok(space),
            _ => Err(Error::unexpected_output("SpaceReactivate")),
        }
    }

    /// Record counts across every layer.
    pub fn stats(&self, space: &MemorySpaceId) -> Result<MemorySpaceStats> {
        match self.executor.execute(Command::SpaceStats {
            space: space.clone(),
        })? {
            Output::SpaceStats(stats) => Ok(stats),
            _ => Err(Error::unexpected_output("SpaceStats")),
        }
    }

    /// Delete a space.
    ///
    /// Without `cascade` the space must hold no records. With it, every
    /// layer's records are removed first.
    pub fn delete(&self, space: &MemorySpaceId, cascade: bool) -> Result<CascadeReport> {
        match self.executor.execute(Command::SpaceDelete {
            space: space.clone(),
            cascade,
        })? {
            Output::Cascade(report) => Ok(report),
            _ => Err(Error::unexpected_output("SpaceDelete")),
        }
    }
}
