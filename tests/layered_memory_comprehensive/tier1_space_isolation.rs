//! Tier 1: Memory Space Isolation
//!
//! A record written into one memory space is invisible from every other
//! space, in every layer, for reads, counts, searches and writes.

use crate::test_utils::*;
use cortexdb::{
    Command, CreateConversation, FactType, FactUpdate, ImmutableEntry, JsonValue, MemorySearch, NewMessage,
    Output, SearchConversations, SetOptions, StoreFact, StoreMemory,
};
use serde_json::json;

#[test]
fn test_conversations_isolated() {
    let db = test_store();
    let a = space("user-a");
    let b = space("user-b");

    let conv = match run(
        &db,
        Command::ConversationCreate {
            input: CreateConversation::user_agent(a.clone(), "alice", "assistant"),
        },
    ) {
        Output::Conversation(c) => c,
        other => panic!("Expected Conversation, got {:?}", other),
    };
    run(
        &db,
        Command::ConversationAddMessage {
            space: a.clone(),
            conversation_id: conv.conversation_id.clone(),
            message: NewMessage::user("my locker code is 4471"),
        },
    );

    match run(
        &db,
        Command::ConversationGet {
            space: b.clone(),
            conversation_id: conv.conversation_id.clone(),
        },
    ) {
        Output::MaybeConversation(None) => {}
        other => panic!("Expected no conversation, got {:?}", other),
    }

    match run(
        &db,
        Command::ConversationHistory {
            space: b.clone(),
            conversation_id: conv.conversation_id.clone(),
            options: Default::default(),
        },
    ) {
        Output::History(None) => {}
        other => panic!("Expected no history, got {:?}", other),
    }

    match run(
        &db,
        Command::ConversationSearch {
            space: b.clone(),
            request: SearchConversations::new("locker"),
        },
    ) {
        Output::ConversationHits(hits) => assert!(hits.is_empty()),
        other => panic!("Expected ConversationHits, got {:?}", other),
    }

    // Appending from the wrong space is refused
    let err = db
        .execute(Command::ConversationAddMessage {
            space: b.clone(),
            conversation_id: conv.conversation_id,
            message: NewMessage::user("hijack"),
        })
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");

    assert_eq!(
        count(&db, Command::ConversationCount { space: a, filter: Default::default() }),
        1
    );
    assert_eq!(
        count(&db, Command::ConversationCount { space: b, filter: Default::default() }),
        0
    );
}

#[test]
fn test_memories_isolated() {
    let db = test_store();
    let a = space("team-a");
    let b = space("team-b");

    let memory = db
        .remember(&a, StoreMemory::new("the staging password rotates on fridays"))
        .unwrap();

    assert!(db.recall(&b, MemorySearch::new("password")).unwrap().is_empty());
    assert_eq!(db.recall(&a, MemorySearch::new("password")).unwrap().len(), 1);

    match run(
        &db,
        Command::MemoryGet {
            space: b.clone(),
            memory_id: memory.memory_id.clone(),
        },
    ) {
        Output::MaybeMemory(None) => {}
        other => panic!("Expected no memory, got {:?}", other),
    }

    // Writes from the wrong space are refused, reads just miss
    let err = db
        .execute(Command::MemoryDelete {
            space: b.clone(),
            memory_id: memory.memory_id.clone(),
        })
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");
    let err = db
        .execute(Command::MemoryDelete {
            space: b,
            memory_id: "mem-never-stored".into(),
        })
        .unwrap_err();
    assert!(err.is_not_found());

    // Still there for its owner
    match run(&db, Command::MemoryGet { space: a, memory_id: memory.memory_id }) {
        Output::MaybeMemory(Some(m)) => assert_eq!(m.history.version, 1),
        other => panic!("Expected memory, got {:?}", other),
    }
}

#[test]
fn test_mutable_namespaces_isolated() {
    let db = test_store();
    let a = space("team-a");
    let b = space("team-b");

    for s in [&a, &b] {
        run(
            &db,
            Command::MutableSet {
                space: s.clone(),
                namespace: "counters".into(),
                key: "builds".into(),
                value: JsonValue::from(0),
                options: SetOptions::default(),
            },
        );
    }
    for _ in 0..3 {
        run(
            &db,
            Command::MutableIncrement {
                space: a.clone(),
                namespace: "counters".into(),
                key: "builds".into(),
                amount: JsonValue::from(1),
            },
        );
    }

    let value_in = |s| match run(
        &db,
        Command::MutableGet {
            space: s,
            namespace: "counters".into(),
            key: "builds".into(),
        },
    ) {
        Output::MaybeMutable(Some(r)) => r.value,
        other => panic!("Expected entry, got {:?}", other),
    };
    assert_eq!(value_in(a), JsonValue::from(3));
    assert_eq!(value_in(b), JsonValue::from(0));
}

#[test]
fn test_facts_isolated() {
    let db = test_store();
    let a = space("team-a");
    let b = space("team-b");

    let fact = match run(
        &db,
        Command::FactStore {
            space: a.clone(),
            input: StoreFact::new("Bob prefers tabs", FactType::Preference, 70)
                .triple("bob", "prefers", "tabs"),
        },
    ) {
        Output::Fact(f) => f,
        other => panic!("Expected Fact, got {:?}", other),
    };

    let foreign_writes = vec![
        Command::FactUpdate {
            space: b.clone(),
            fact_id: fact.fact_id.clone(),
            update: FactUpdate {
                object: Some("spaces".into()),
                ..Default::default()
            },
            reason: None,
        },
        Command::FactDelete {
            space: b.clone(),
            fact_id: fact.fact_id.clone(),
        },
    ];
    for command in foreign_writes {
        let err = db.execute(command.clone()).unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED", "{:?}", command);
    }

    match run(
        &db,
        Command::FactQueryBySubject {
            space: b.clone(),
            subject: "bob".into(),
            include_superseded: true,
        },
    ) {
        Output::Facts(facts) => assert!(facts.is_empty()),
        other => panic!("Expected Facts, got {:?}", other),
    }
    match run(
        &db,
        Command::FactQueryBySubject {
            space: a,
            subject: "bob".into(),
            include_superseded: false,
        },
    ) {
        Output::Facts(facts) => {
            assert_eq!(facts.len(), 1);
            assert!(facts[0].is_current());
        }
        other => panic!("Expected Facts, got {:?}", other),
    }
}

#[test]
fn test_immutable_scopes() {
    let db = test_store();
    let a = space("team-a");

    run(
        &db,
        Command::ImmutableStore {
            space: Some(a.clone()),
            entry: ImmutableEntry::new("policy", "retention", JsonValue::from(json!({"days": 30}))),
            expected_version: None,
        },
    );
    run(
        &db,
        Command::ImmutableStore {
            space: None,
            entry: ImmutableEntry::new("policy", "retention", JsonValue::from(json!({"days": 90}))),
            expected_version: None,
        },
    );

    // Same type and id, two independent records
    let days = |space| match run(
        &db,
        Command::ImmutableGet {
            space,
            record_type: "policy".into(),
            id: "retention".into(),
        },
    ) {
        Output::MaybeImmutable(Some(r)) => r.data.as_inner()["days"].clone(),
        other => panic!("Expected record, got {:?}", other),
    };
    assert_eq!(days(Some(a)), json!(30));
    assert_eq!(days(None), json!(90));

    match run(
        &db,
        Command::ImmutableGet {
            space: Some(space("team-b")),
            record_type: "policy".into(),
            id: "retention".into(),
        },
    ) {
        Output::MaybeImmutable(None) => {}
        other => panic!("Expected no record, got {:?}", other),
    }
}
