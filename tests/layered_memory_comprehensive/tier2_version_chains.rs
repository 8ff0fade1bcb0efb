//! Tier 2: Version Chains
//!
//! Immutable records, memories and contexts keep their previous versions.
//! Facts version by supersession instead. Every chain answers "what was
//! true at time t" the same way.

use crate::test_utils::*;
use cortexdb::{
    Command, ContextStatus, ContextUpdate, CreateContext, Error, FactType, FactUpdate,
    ImmutableEntry, JsonValue, MemoryUpdate, Output, StoreFact, StoreMemory,
};
use serde_json::json;

fn store_immutable(db: &cortexdb::Cortex, days: i64) -> cortexdb::ImmutableRecord {
    match run(
        db,
        Command::ImmutableStore {
            space: None,
            entry: ImmutableEntry::new("policy", "retention", JsonValue::from(json!({ "days": days }))),
            expected_version: None,
        },
    ) {
        Output::Immutable(r) => r,
        other => panic!("Expected Immutable, got {:?}", other),
    }
}

#[test]
fn test_immutable_point_in_time() {
    let db = manual_clock_store(10_000);
    let v1 = store_immutable(&db, 30);
    clock(&db).advance(1_000);
    let v2 = store_immutable(&db, 60);
    clock(&db).advance(1_000);
    let v3 = store_immutable(&db, 90);

    assert_eq!(
        (v1.history.version, v2.history.version, v3.history.version),
        (1, 2, 3)
    );
    assert!(v1.updated_at < v2.updated_at && v2.updated_at < v3.updated_at);

    let at = |timestamp| match run(
        &db,
        Command::ImmutableGetAt {
            space: None,
            record_type: "policy".into(),
            id: "retention".into(),
            timestamp,
        },
    ) {
        Output::MaybeImmutable(r) => r.map(|r| r.history.version),
        other => panic!("Expected MaybeImmutable, got {:?}", other),
    };
    assert_eq!(at(v1.updated_at - 1), None);
    assert_eq!(at(v1.updated_at), Some(1));
    assert_eq!(at(v2.updated_at - 1), Some(1));
    assert_eq!(at(v2.updated_at), Some(2));
    assert_eq!(at(v3.updated_at + 5_000), Some(3));

    match run(
        &db,
        Command::ImmutableHistory {
            space: None,
            record_type: "policy".into(),
            id: "retention".into(),
        },
    ) {
        Output::Immutables(versions) => {
            let days: Vec<_> = versions
                .iter()
                .map(|r| r.data.as_inner()["days"].clone())
                .collect();
            assert_eq!(days, vec![json!(30), json!(60), json!(90)]);
        }
        other => panic!("Expected Immutables, got {:?}", other),
    }
}

#[test]
fn test_immutable_optimistic_store() {
    let db = test_store();
    store_immutable(&db, 30);
    store_immutable(&db, 60);

    let err = db
        .execute(Command::ImmutableStore {
            space: None,
            entry: ImmutableEntry::new("policy", "retention", JsonValue::from(json!({"days": 7}))),
            expected_version: Some(1),
        })
        .unwrap_err();
    match err {
        Error::VersionConflict { expected, actual, .. } => assert_eq!((expected, actual), (1, 2)),
        other => panic!("Expected VersionConflict, got {:?}", other),
    }

    match run(
        &db,
        Command::ImmutableStore {
            space: None,
            entry: ImmutableEntry::new("policy", "retention", JsonValue::from(json!({"days": 7}))),
            expected_version: Some(2),
        },
    ) {
        Output::Immutable(r) => assert_eq!(r.history.version, 3),
        other => panic!("Expected Immutable, got {:?}", other),
    }
}

#[test]
fn test_purge_versions_keeps_current() {
    let db = test_store();
    for days in [1, 2, 3, 4] {
        store_immutable(&db, days);
    }

    match run(
        &db,
        Command::ImmutablePurgeVersions {
            space: None,
            record_type: "policy".into(),
            id: "retention".into(),
            keep_latest: 2,
        },
    ) {
        Output::VersionsPurged(r) => {
            assert_eq!(r.versions_purged, 2);
            assert_eq!(r.versions_remaining, 2);
        }
        other => panic!("Expected VersionsPurged, got {:?}", other),
    }

    let version = |version| match run(
        &db,
        Command::ImmutableGetVersion {
            space: None,
            record_type: "policy".into(),
            id: "retention".into(),
            version,
        },
    ) {
        Output::MaybeImmutable(r) => r.map(|r| r.data.as_inner()["days"].clone()),
        other => panic!("Expected MaybeImmutable, got {:?}", other),
    };
    assert_eq!(version(1), None);
    assert_eq!(version(3), Some(json!(3)));
    assert_eq!(version(4), Some(json!(4)));

    let err = db
        .execute(Command::ImmutablePurgeVersions {
            space: None,
            record_type: "policy".into(),
            id: "retention".into(),
            keep_latest: 0,
        })
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn test_memory_versions() {
    let db = manual_clock_store(50_000);
    let s = space("user-1-personal");
    let original = db
        .remember(&s, StoreMemory::new("favourite colour is blue").importance(40))
        .unwrap();
    clock(&db).advance(500);

    let updated = match run(
        &db,
        Command::MemoryUpdate {
            space: s.clone(),
            memory_id: original.memory_id.clone(),
            update: MemoryUpdate {
                content: Some("favourite colour is green".into()),
                ..Default::default()
            },
            expected_version: Some(1),
        },
    ) {
        Output::Memory(m) => m,
        other => panic!("Expected Memory, got {:?}", other),
    };
    assert_eq!(updated.history.version, 2);
    assert_eq!(updated.importance, 40);
    assert_eq!(updated.created_at, original.created_at);

    // A writer still holding version 1 loses
    let err = db
        .execute(Command::MemoryUpdate {
            space: s.clone(),
            memory_id: original.memory_id.clone(),
            update: MemoryUpdate {
                importance: Some(90),
                ..Default::default()
            },
            expected_version: Some(1),
        })
        .unwrap_err();
    assert_eq!(err.code(), "VERSION_CONFLICT");

    match run(
        &db,
        Command::MemoryGetAt {
            space: s.clone(),
            memory_id: original.memory_id.clone(),
            timestamp: updated.updated_at - 1,
        },
    ) {
        Output::MaybeMemory(Some(m)) => assert_eq!(m.content, "favourite colour is blue"),
        other => panic!("Expected memory, got {:?}", other),
    }

    match run(
        &db,
        Command::MemoryHistory {
            space: s,
            memory_id: original.memory_id,
        },
    ) {
        Output::Memories(versions) => {
            let contents: Vec<_> = versions.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, vec!["favourite colour is blue", "favourite colour is green"]);
        }
        other => panic!("Expected Memories, got {:?}", other),
    }
}

#[test]
fn test_context_versions() {
    let db = manual_clock_store(1_000);
    let s = space("team-a");
    let ctx = match run(
        &db,
        Command::ContextCreate {
            input: CreateContext::new(s, "ship the release").with_id("ctx-release"),
        },
    ) {
        Output::Context(c) => c,
        other => panic!("Expected Context, got {:?}", other),
    };
    assert_eq!(ctx.status, ContextStatus::Active);
    clock(&db).advance(100);

    let done = match run(
        &db,
        Command::ContextUpdate {
            context_id: "ctx-release".into(),
            update: ContextUpdate {
                status: Some(ContextStatus::Completed),
                ..Default::default()
            },
            expected_version: Some(1),
        },
    ) {
        Output::Context(c) => c,
        other => panic!("Expected Context, got {:?}", other),
    };
    assert_eq!(done.history.version, 2);
    assert!(done.completed_at.is_some());

    match run(
        &db,
        Command::ContextGetVersion {
            context_id: "ctx-release".into(),
            version: 1,
        },
    ) {
        Output::MaybeContext(Some(c)) => {
            assert_eq!(c.status, ContextStatus::Active);
        }
        other => panic!("Expected context, got {:?}", other),
    }

    match run(&db, Command::ContextHistory { context_id: "ctx-release".into() }) {
        Output::Contexts(versions) => assert_eq!(versions.len(), 2),
        other => panic!("Expected Contexts, got {:?}", other),
    }
}

#[test]
fn test_fact_supersession_chain() {
    let db = test_store();
    let s = space("user-1-personal");

    let first = match run(
        &db,
        Command::FactStore {
            space: s.clone(),
            input: StoreFact::new("User lives in Paris", FactType::Identity, 90)
                .triple("user-1", "lives_in", "paris"),
        },
    ) {
        Output::Fact(f) => f,
        other => panic!("Expected Fact, got {:?}", other),
    };

    let mut latest = first.clone();
    for city in ["berlin", "lisbon"] {
        latest = match run(
            &db,
            Command::FactUpdate {
                space: s.clone(),
                fact_id: latest.fact_id.clone(),
                update: FactUpdate {
                    object: Some(city.into()),
                    fact: Some(format!("User lives in {}", city)),
                    ..Default::default()
                },
                reason: Some("moved".into()),
            },
        ) {
            Output::Fact(f) => f,
            other => panic!("Expected Fact, got {:?}", other),
        };
    }
    assert_eq!(latest.object.as_deref(), Some("lisbon"));
    assert_eq!(latest.supersession_reason.as_deref(), Some("moved"));
    assert_eq!(latest.confidence, 90);

    match run(
        &db,
        Command::FactQueryByRelationship {
            space: s.clone(),
            subject: "user-1".into(),
            predicate: "lives_in".into(),
            include_superseded: false,
        },
    ) {
        Output::Facts(facts) => {
            assert_eq!(facts.len(), 1);
            assert_eq!(facts[0].fact_id, latest.fact_id);
        }
        other => panic!("Expected Facts, got {:?}", other),
    }

    match run(
        &db,
        Command::FactHistory {
            space: s.clone(),
            fact_id: first.fact_id.clone(),
        },
    ) {
        Output::Facts(chain) => {
            let objects: Vec<_> = chain.iter().filter_map(|f| f.object.as_deref()).collect();
            assert_eq!(objects, vec!["paris", "berlin", "lisbon"]);
        }
        other => panic!("Expected Facts, got {:?}", other),
    }

    match run(&db, Command::FactGet { space: s, fact_id: first.fact_id }) {
        Output::MaybeFact(Some(f)) => {
            assert!(!f.is_current());
            assert!(f.superseded_by.is_some());
        }
        other => panic!("Expected fact, got {:?}", other),
    }
}
