//! Bridge between the executor and the engine primitives.
//!
//! `Primitives` owns one facade per memory layer, all sharing the same
//! `Database`. Handlers receive it by reference and never build facades of
//! their own.

use std::sync::Arc;

use cortex_engine::{
    ContextStore, ConversationStore, Database, FactStore, ImmutableStore, MemorySpaceRegistry,
    MemoryStore, MutableStore, A2A,
};

/// Every memory layer facade over one database
pub struct Primitives {
    pub db: Arc<Database>,
    pub spaces: MemorySpaceRegistry,
    pub conversations: ConversationStore,
    pub immutable: ImmutableStore,
    pub mutable: MutableStore,
    pub memories: MemoryStore,
    pub facts: FactStore,
    pub contexts: ContextStore,
    pub a2a: A2A,
}

impl Primitives {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            spaces: MemorySpaceRegistry::new(db.clone()),
            conversations: ConversationStore::new(db.clone()),
            immutable: ImmutableStore::new(db.clone()),
            mutable: MutableStore::new(db.clone()),
            memories: MemoryStore::new(db.clone()),
            facts: FactStore::new(db.clone()),
            contexts: ContextStore::new(db.clone()),
            a2a: A2A::new(db.clone()),
            db,
        }
    }
}
