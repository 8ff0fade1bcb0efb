//! Tier 4: Guards
//!
//! Environment gating of destructive maintenance, read-only stores,
//! archived memory spaces and input validation.

use crate::test_utils::*;
use cortexdb::{
    AccessMode, Command, CortexConfig, CreateContext, CreateConversation, Environment, FactType,
    ImmutableEntry, JsonValue, MemorySearch, MemorySpaceFilter, NewMessage, Output,
    RegisterMemorySpace, SetOptions, SpaceType, StoreFact, StoreMemory,
};

fn purge_commands() -> Vec<Command> {
    vec![
        Command::SpacePurgeAll,
        Command::ConversationPurgeAll,
        Command::ImmutablePurgeAll,
        Command::MutablePurgeAll,
        Command::MemoryPurgeAll,
        Command::FactPurgeAll,
        Command::ContextPurgeAll,
    ]
}

#[test]
fn test_purge_all_refused_in_production() {
    let db = production_store();
    db.remember(&space("team-a"), StoreMemory::new("keep me")).unwrap();

    for command in purge_commands() {
        let err = db.execute(command.clone()).unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED", "{:?}", command);
    }
    assert_eq!(
        db.recall(&space("team-a"), MemorySearch::new("keep")).unwrap().len(),
        1
    );
}

#[test]
fn test_purge_all_in_test_environment() {
    let db = test_store();
    let s = space("team-a");
    db.spaces()
        .register(RegisterMemorySpace::new(s.clone(), SpaceType::Team))
        .unwrap();
    db.remember(&s, StoreMemory::new("one")).unwrap();
    db.remember(&space("team-b"), StoreMemory::new("two")).unwrap();

    assert_eq!(count(&db, Command::MemoryPurgeAll), 2);
    assert_eq!(count(&db, Command::SpacePurgeAll), 1);
    for command in purge_commands() {
        assert_eq!(count(&db, command), 0);
    }
}

#[test]
fn test_environment_fixed_after_open() {
    let db = production_store();
    let err = db
        .set_config(CortexConfig::for_environment(Environment::Dev))
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");
    assert_eq!(db.info().unwrap().environment, Environment::Production);

    // Other settings can change
    let mut config = db.config().unwrap();
    config.search.default_limit = 3;
    db.set_config(config).unwrap();
    assert_eq!(db.config().unwrap().search.default_limit, 3);
}

#[test]
fn test_read_only_store() {
    let db = open(Environment::Test, AccessMode::ReadOnly);
    let s = space("team-a");

    let writes = vec![
        Command::MemoryStore {
            space: s.clone(),
            input: StoreMemory::new("nope"),
        },
        Command::MutableSet {
            space: s.clone(),
            namespace: "ns".into(),
            key: "k".into(),
            value: JsonValue::from(1),
            options: SetOptions::default(),
        },
        Command::ImmutableStore {
            space: None,
            entry: ImmutableEntry::new("doc", "d1", JsonValue::from("x")),
            expected_version: None,
        },
        Command::SpaceRegister {
            input: RegisterMemorySpace::new(s.clone(), SpaceType::Team),
        },
        Command::MemoryPurgeAll,
    ];
    for command in writes {
        let err = db.execute(command.clone()).unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED", "{:?}", command);
    }

    // Reads are served
    assert!(db.recall(&s, MemorySearch::new("anything")).unwrap().is_empty());
    assert!(db.spaces().list(MemorySpaceFilter::default()).unwrap().is_empty());
    assert_eq!(db.info().unwrap().access_mode, AccessMode::ReadOnly);
}

#[test]
fn test_archived_space_rejects_every_layer() {
    let db = test_store();
    let s = space("frozen");
    db.spaces()
        .register(RegisterMemorySpace::new(s.clone(), SpaceType::Project))
        .unwrap();
    let conv = match run(
        &db,
        Command::ConversationCreate {
            input: CreateConversation::user_agent(s.clone(), "u1", "agent"),
        },
    ) {
        Output::Conversation(c) => c,
        other => panic!("Expected Conversation, got {:?}", other),
    };
    db.spaces().archive(&s).unwrap();

    let writes = vec![
        Command::ConversationAddMessage {
            space: s.clone(),
            conversation_id: conv.conversation_id.clone(),
            message: NewMessage::user("late"),
        },
        Command::ConversationCreate {
            input: CreateConversation::user_agent(s.clone(), "u2", "agent"),
        },
        Command::MemoryStore {
            space: s.clone(),
            input: StoreMemory::new("late"),
        },
        Command::FactStore {
            space: s.clone(),
            input: StoreFact::new("late", FactType::Event, 50),
        },
        Command::MutableSet {
            space: s.clone(),
            namespace: "ns".into(),
            key: "k".into(),
            value: JsonValue::from(true),
            options: SetOptions::default(),
        },
        Command::ImmutableStore {
            space: Some(s.clone()),
            entry: ImmutableEntry::new("doc", "d1", JsonValue::from("x")),
            expected_version: None,
        },
        Command::ContextCreate {
            input: CreateContext::new(s.clone(), "late"),
        },
    ];
    for command in writes {
        let err = db.execute(command.clone()).unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED", "{:?}", command);
    }

    match run(
        &db,
        Command::ConversationGet {
            space: s.clone(),
            conversation_id: conv.conversation_id.clone(),
        },
    ) {
        Output::MaybeConversation(Some(c)) => assert_eq!(c.message_count, 0),
        other => panic!("Expected conversation, got {:?}", other),
    }

    db.spaces().reactivate(&s).unwrap();
    run(
        &db,
        Command::ConversationAddMessage {
            space: s,
            conversation_id: conv.conversation_id,
            message: NewMessage::user("back again"),
        },
    );
}

#[test]
fn test_input_validation() {
    let db = test_store();
    let s = space("team-a");
    run(
        &db,
        Command::MutableSet {
            space: s.clone(),
            namespace: "ns".into(),
            key: "k".into(),
            value: JsonValue::from(1),
            options: SetOptions::default(),
        },
    );

    let invalid = vec![
        Command::MemoryStore {
            space: s.clone(),
            input: StoreMemory::new("   "),
        },
        Command::MemoryStore {
            space: s.clone(),
            input: StoreMemory::new("too important").importance(101),
        },
        Command::FactStore {
            space: s.clone(),
            input: StoreFact::new("overconfident", FactType::Knowledge, 150),
        },
        Command::MutableIncrement {
            space: s.clone(),
            namespace: "ns".into(),
            key: "k".into(),
            amount: JsonValue::from("one"),
        },
        Command::MutableTransaction {
            space: s.clone(),
            ops: Vec::new(),
        },
    ];
    for command in invalid {
        let err = db.execute(command.clone()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR", "{:?}", command);
    }
}

#[test]
fn test_duplicate_ids_rejected() {
    let db = test_store();
    let s = space("team-a");
    let create = || Command::ConversationCreate {
        input: CreateConversation::user_agent(s.clone(), "u1", "agent").with_id("conv-fixed"),
    };
    run(&db, create());
    let err = db.execute(create()).unwrap_err();
    assert_eq!(err.code(), "ALREADY_EXISTS");

    let register = || Command::SpaceRegister {
        input: RegisterMemorySpace::new(s.clone(), SpaceType::Team),
    };
    run(&db, register());
    let err = db.execute(register()).unwrap_err();
    assert_eq!(err.code(), "ALREADY_EXISTS");
}
