//! Tier 3: Cross-Layer Behavior
//!
//! References between layers, space-wide cascades, agent-to-agent
//! messaging and the context tree spanning memory spaces.

use crate::test_utils::*;
use cortexdb::{
    A2ASendOptions, Command, ConversationFilter, CreateContext, CreateConversation, ExportFormat,
    FactFilter, FactSourceRef, FactSourceType, FactType, JsonValue, MemoryFilter, NewMessage,
    Output, RegisterMemorySpace, SetOptions, SourceType, SpaceType, StoreFact, StoreMemory,
    TransactionOp, UpdateOp,
};
use serde_json::json;

#[test]
fn test_conversation_memory_fact_pipeline() {
    let db = test_store();
    let s = space("user-7-personal");
    db.spaces()
        .register(RegisterMemorySpace::new(s.clone(), SpaceType::Personal))
        .unwrap();

    let conv = match run(
        &db,
        Command::ConversationCreate {
            input: CreateConversation::user_agent(s.clone(), "user-7", "assistant"),
        },
    ) {
        Output::Conversation(c) => c,
        other => panic!("Expected Conversation, got {:?}", other),
    };
    let message = match run(
        &db,
        Command::ConversationAddMessage {
            space: s.clone(),
            conversation_id: conv.conversation_id.clone(),
            message: NewMessage::user("I'm allergic to peanuts"),
        },
    ) {
        Output::Conversation(c) => c.last_message().cloned().expect("message appended"),
        other => panic!("Expected Conversation, got {:?}", other),
    };

    let memory = db
        .remember(
            &s,
            StoreMemory::new("user is allergic to peanuts")
                .source(SourceType::Conversation)
                .conversation_ref(conv.conversation_id.clone(), vec![message.id.clone()])
                .importance(95),
        )
        .unwrap();

    let fact = match run(
        &db,
        Command::FactStore {
            space: s.clone(),
            input: StoreFact::new("User is allergic to peanuts", FactType::Identity, 95)
                .triple("user-7", "allergic_to", "peanuts")
                .source(FactSourceType::Conversation)
                .source_ref(FactSourceRef {
                    conversation_id: Some(conv.conversation_id.clone()),
                    message_ids: vec![message.id.clone()],
                    memory_id: Some(memory.memory_id.clone()),
                }),
        },
    ) {
        Output::Fact(f) => f,
        other => panic!("Expected Fact, got {:?}", other),
    };

    // Follow the memory back to the exact message it was derived from
    let conversation_ref = memory.conversation_ref.clone().expect("reference kept");
    match run(
        &db,
        Command::ConversationGetMessages {
            space: s.clone(),
            conversation_id: conversation_ref.conversation_id,
            message_ids: conversation_ref.message_ids,
        },
    ) {
        Output::Messages(messages) => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].content, "I'm allergic to peanuts");
        }
        other => panic!("Expected Messages, got {:?}", other),
    }

    let source = fact.source_ref.clone().expect("source kept");
    assert_eq!(source.memory_id.as_deref(), Some(memory.memory_id.as_str()));

    let stats = db.spaces().stats(&s).unwrap();
    assert_eq!(stats.conversations, 1);
    assert_eq!(stats.messages, 1);
    assert_eq!(stats.memories, 1);
    assert_eq!(stats.facts, 1);
    assert_eq!(stats.total_records(), 3);

    let report = db.spaces().delete(&s, true).unwrap();
    assert_eq!(report.total_deleted(), 3);
    assert_eq!(
        count(&db, Command::MemoryCount { space: s.clone(), filter: MemoryFilter::default() }),
        0
    );
    assert_eq!(
        count(&db, Command::FactCount { space: s, filter: FactFilter::default() }),
        0
    );
}

#[test]
fn test_agent_messaging_round_trip() {
    let db = test_store();
    let planner = space("planner");
    let coder = space("coder");

    let sent = match run(
        &db,
        Command::A2aSend {
            from: planner.clone(),
            to: coder.clone(),
            message: "implement the retry loop".into(),
            options: A2ASendOptions {
                importance: Some(80),
                ..Default::default()
            },
        },
    ) {
        Output::A2aSent(r) => r,
        other => panic!("Expected A2aSent, got {:?}", other),
    };
    let reply = db
        .send(&coder, &planner, "retry loop merged", A2ASendOptions::default())
        .unwrap();
    assert_eq!(sent.conversation_id, reply.conversation_id);

    let received = MemoryFilter {
        tags: ["a2a".to_string(), "received".to_string()].into_iter().collect(),
        ..Default::default()
    };
    match run(&db, Command::MemoryList { space: coder.clone(), filter: received }) {
        Output::Memories(memories) => {
            assert_eq!(memories.len(), 1);
            assert_eq!(memories[0].content, "implement the retry loop");
            assert_eq!(memories[0].importance, 80);
            assert_eq!(memories[0].source.source_type, SourceType::A2a);
        }
        other => panic!("Expected Memories, got {:?}", other),
    }

    // Each side holds one sent and one received copy
    for s in [&planner, &coder] {
        assert_eq!(
            count(&db, Command::MemoryCount { space: s.clone(), filter: MemoryFilter::default() }),
            2
        );
    }

    match run(&db, Command::A2aConversation { a: coder, b: planner }) {
        Output::MaybeConversation(Some(conv)) => {
            let contents: Vec<_> = conv.messages.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, vec!["implement the retry loop", "retry loop merged"]);
        }
        other => panic!("Expected conversation, got {:?}", other),
    }
}

#[test]
fn test_untracked_send_skips_conversation() {
    let db = test_store();
    let sent = db
        .send(
            &space("a"),
            &space("b"),
            "fire and forget",
            A2ASendOptions {
                track_conversation: false,
                ..Default::default()
            },
        )
        .unwrap();
    assert!(sent.conversation_id.is_none());
    match run(&db, Command::A2aConversation { a: space("a"), b: space("b") }) {
        Output::MaybeConversation(None) => {}
        other => panic!("Expected no conversation, got {:?}", other),
    }
}

#[test]
fn test_context_tree_across_spaces() {
    let db = test_store();
    let lead = space("lead");
    let worker = space("worker");

    run(
        &db,
        Command::ContextCreate {
            input: CreateContext::new(lead.clone(), "launch v2").with_id("ctx-launch"),
        },
    );

    let denied = db
        .execute(Command::ContextCreate {
            input: CreateContext::new(worker.clone(), "write docs")
                .with_id("ctx-docs")
                .child_of("ctx-launch"),
        })
        .unwrap_err();
    assert_eq!(denied.code(), "PERMISSION_DENIED");

    run(
        &db,
        Command::ContextGrantAccess {
            context_id: "ctx-launch".into(),
            space: worker.clone(),
            scope: "children".into(),
        },
    );
    let child = match run(
        &db,
        Command::ContextCreate {
            input: CreateContext::new(worker.clone(), "write docs")
                .with_id("ctx-docs")
                .child_of("ctx-launch"),
        },
    ) {
        Output::Context(c) => c,
        other => panic!("Expected Context, got {:?}", other),
    };
    assert_eq!(child.root_id, "ctx-launch");
    assert_eq!(child.depth, 1);

    run(
        &db,
        Command::ContextCreate {
            input: CreateContext::new(worker.clone(), "proofread")
                .with_id("ctx-proofread")
                .child_of("ctx-docs"),
        },
    );

    match run(&db, Command::ContextChain { context_id: "ctx-proofread".into() }) {
        Output::ContextChain(chain) => {
            assert_eq!(chain.root.context_id, "ctx-launch");
            assert_eq!(chain.depth, 2);
            let ancestors: Vec<_> = chain.ancestors.iter().map(|c| c.context_id.as_str()).collect();
            assert_eq!(ancestors, vec!["ctx-launch", "ctx-docs"]);
        }
        other => panic!("Expected ContextChain, got {:?}", other),
    }

    match run(
        &db,
        Command::ContextChildren {
            context_id: "ctx-launch".into(),
            recursive: true,
        },
    ) {
        Output::Contexts(children) => assert_eq!(children.len(), 2),
        other => panic!("Expected Contexts, got {:?}", other),
    }

    let err = db
        .execute(Command::ContextDelete {
            context_id: "ctx-launch".into(),
            cascade: false,
        })
        .unwrap_err();
    assert_eq!(err.code(), "STRUCTURAL_ERROR");

    match run(
        &db,
        Command::ContextDelete {
            context_id: "ctx-launch".into(),
            cascade: true,
        },
    ) {
        Output::ContextDeleted(report) => {
            assert_eq!(report.deleted.len(), 3);
            assert_eq!(report.deleted.last().map(String::as_str), Some("ctx-launch"));
            assert!(report.orphaned.is_empty());
        }
        other => panic!("Expected ContextDeleted, got {:?}", other),
    }
}

#[test]
fn test_space_cascade_reports_orphans() {
    let db = test_store();
    let lead = space("lead");
    let worker = space("worker");
    db.spaces()
        .register(RegisterMemorySpace::new(lead.clone(), SpaceType::Team))
        .unwrap();

    run(
        &db,
        Command::ContextCreate {
            input: CreateContext::new(lead.clone(), "quarterly plan").with_id("ctx-plan"),
        },
    );
    run(
        &db,
        Command::ContextGrantAccess {
            context_id: "ctx-plan".into(),
            space: worker.clone(),
            scope: "children".into(),
        },
    );
    run(
        &db,
        Command::ContextCreate {
            input: CreateContext::new(worker, "draft budget")
                .with_id("ctx-budget")
                .child_of("ctx-plan"),
        },
    );

    let report = db.spaces().delete(&lead, true).unwrap();
    assert_eq!(report.contexts, 1);
    assert_eq!(report.orphaned_contexts, vec!["ctx-budget".to_string()]);

    // The orphan survives in its own space
    match run(&db, Command::ContextGet { context_id: "ctx-budget".into() }) {
        Output::MaybeContext(Some(c)) => assert_eq!(c.memory_space_id, space("worker")),
        other => panic!("Expected context, got {:?}", other),
    }
}

#[test]
fn test_exports() {
    let db = test_store();
    let s = space("support");
    for (user, text) in [("u1", "printer, again"), ("u2", "password \"reset\"")] {
        let conv = match run(
            &db,
            Command::ConversationCreate {
                input: CreateConversation::user_agent(s.clone(), user, "helpdesk"),
            },
        ) {
            Output::Conversation(c) => c,
            other => panic!("Expected Conversation, got {:?}", other),
        };
        run(
            &db,
            Command::ConversationAddMessage {
                space: s.clone(),
                conversation_id: conv.conversation_id,
                message: NewMessage::user(text),
            },
        );
    }

    let csv = match run(
        &db,
        Command::ConversationExport {
            space: s.clone(),
            filter: ConversationFilter::default(),
            format: ExportFormat::Csv,
        },
    ) {
        Output::Text(text) => text,
        other => panic!("Expected Text, got {:?}", other),
    };
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("conversation_id,memory_space_id,type"));
    assert!(csv.contains(",support,user-agent,u1,helpdesk,1,"));
    assert!(csv.contains(",support,user-agent,u2,helpdesk,1,"));

    run(
        &db,
        Command::FactStore {
            space: s.clone(),
            input: StoreFact::new("u1 owns a printer", FactType::Knowledge, 60),
        },
    );
    let exported = match run(
        &db,
        Command::FactExport {
            space: s,
            filter: FactFilter::default(),
            format: ExportFormat::Json,
        },
    ) {
        Output::Text(text) => text,
        other => panic!("Expected Text, got {:?}", other),
    };
    let facts: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(facts.as_array().map(Vec::len), Some(1));
    assert_eq!(facts[0]["fact"], "u1 owns a printer");
}

#[test]
fn test_transaction_all_or_nothing() {
    let db = test_store();
    let s = space("billing");
    run(
        &db,
        Command::MutableSet {
            space: s.clone(),
            namespace: "balances".into(),
            key: "alice".into(),
            value: JsonValue::from(100),
            options: SetOptions::default(),
        },
    );

    let transfer = |amount: i64, to: &str| Command::MutableTransaction {
        space: s.clone(),
        ops: vec![
            TransactionOp::Update {
                namespace: "balances".into(),
                key: "alice".into(),
                op: UpdateOp::Decrement(JsonValue::from(amount)),
            },
            TransactionOp::Update {
                namespace: "balances".into(),
                key: to.into(),
                op: UpdateOp::Increment(JsonValue::from(amount)),
            },
        ],
    };

    // Bob has no balance yet, so nothing is applied
    let err = db.execute(transfer(30, "bob")).unwrap_err();
    assert!(err.is_not_found());

    run(
        &db,
        Command::MutableSet {
            space: s.clone(),
            namespace: "balances".into(),
            key: "bob".into(),
            value: JsonValue::from(0),
            options: SetOptions::default(),
        },
    );
    match run(&db, transfer(30, "bob")) {
        Output::Transaction(result) => {
            assert_eq!(result.operations, 2);
            assert_eq!(result.written, 2);
        }
        other => panic!("Expected Transaction, got {:?}", other),
    }

    let balance = |key: &str| match run(
        &db,
        Command::MutableGet {
            space: s.clone(),
            namespace: "balances".into(),
            key: key.into(),
        },
    ) {
        Output::MaybeMutable(Some(r)) => r.value.as_inner().clone(),
        other => panic!("Expected entry, got {:?}", other),
    };
    assert_eq!(balance("alice"), json!(70));
    assert_eq!(balance("bob"), json!(30));
}
