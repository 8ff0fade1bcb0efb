//! Memory and messaging shortcuts.

use super::Cortex;
use crate::{Command, Error, Output, Result};
use cortex_core::MemorySpaceId;
use cortex_engine::{
    A2ASendOptions, A2ASendResult, BroadcastResult, MemoryRecord, MemorySearch, MemorySearchHit,
    StoreMemory,
};

impl Cortex {
    /// Store a memory.
    pub fn remember(&self, space: &MemorySpaceId, input: StoreMemory) -> Result<MemoryRecord> {
        match self.execute(Command::MemoryStore {
            space: space.clone(),
            input,
        })? {
            Output::Memory(memory) => Ok(memory),
            _ => Err(Error::unexpected_output("MemoryStore")),
        }
    }

    /// Search memories by keyword or embedding.
    pub fn recall(&self, space: &MemorySpaceId, search: MemorySearch) -> Result<Vec<MemorySearchHit>> {
        match self.execute(Command::MemorySearch {
            space: space.clone(),
            search,
        })? {
            Output::MemoryHits(hits) => Ok(hits),
            _ => Err(Error::unexpected_output("MemorySearch")),
        }
    }

    /// Send a message from one agent's space to another's.
    pub fn send(
        &self,
        from: &MemorySpaceId,
        to: &MemorySpaceId,
        message: &str,
        options: A2ASendOptions,
    ) -> Result<A2ASendResult> {
        match self.execute(Command::A2aSend {
            from: from.clone(),
            to: to.clone(),
            message: message.to_string(),
            options,
        })? {
            Output::A2aSent(sent) => Ok(sent),
            _ => Err(Error::unexpected_output("A2aSend")),
        }
    }

    /// Send the same message to several spaces.
    pub fn broadcast(
        &self,
        from: &MemorySpaceId,
        recipients: &[MemorySpaceId],
        message: &str,
        options: A2ASendOptions,
    ) -> Result<BroadcastResult> {
        match self.execute(Command::A2aBroadcast {
            from: from.clone(),
            recipients: recipients.to_vec(),
            message: message.to_string(),
            options,
        })? {
            Output::A2aBroadcast(result) => Ok(result),
            _ => Err(Error::unexpected_output("A2aBroadcast")),
        }
    }
}
