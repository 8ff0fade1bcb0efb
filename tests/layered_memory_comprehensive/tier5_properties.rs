//! Tier 5: Property-Based Invariants
//!
//! Paging, arithmetic and version numbering hold for arbitrary inputs.

use crate::test_utils::*;
use cortexdb::{
    Command, CreateConversation, HistoryOptions, ImmutableEntry, JsonValue, MemoryFilter,
    NewMessage, Output, SetOptions, SortOrder, StoreMemory,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn history_pages_partition_the_log(
        n in 0usize..25,
        offset in 0usize..30,
        limit in 1usize..10,
        descending in any::<bool>(),
    ) {
        let db = test_store();
        let s = space("user-1-personal");
        let conv = match run(&db, Command::ConversationCreate {
            input: CreateConversation::user_agent(s.clone(), "user-1", "assistant"),
        }) {
            Output::Conversation(c) => c,
            other => panic!("Expected Conversation, got {:?}", other),
        };
        for i in 0..n {
            run(&db, Command::ConversationAddMessage {
                space: s.clone(),
                conversation_id: conv.conversation_id.clone(),
                message: NewMessage::user(format!("message {}", i)),
            });
        }

        let order = if descending { SortOrder::Desc } else { SortOrder::Asc };
        let page = match run(&db, Command::ConversationHistory {
            space: s,
            conversation_id: conv.conversation_id,
            options: HistoryOptions { offset, limit: Some(limit), order, ..Default::default() },
        }) {
            Output::History(Some(page)) => page,
            other => panic!("Expected history, got {:?}", other),
        };

        let expected_len = n.saturating_sub(offset).min(limit);
        prop_assert_eq!(page.total, n);
        prop_assert_eq!(page.messages.len(), expected_len);
        prop_assert_eq!(page.has_more, offset + expected_len < n);
        for (i, m) in page.messages.iter().enumerate() {
            let position = offset + i;
            let index = if descending { n - 1 - position } else { position };
            prop_assert_eq!(&m.content, &format!("message {}", index));
        }
    }

    #[test]
    fn increments_sum(amounts in proptest::collection::vec(-1_000i64..1_000, 1..40)) {
        let db = test_store();
        let s = space("counters");
        run(&db, Command::MutableSet {
            space: s.clone(),
            namespace: "stats".into(),
            key: "total".into(),
            value: JsonValue::from(0i64),
            options: SetOptions::default(),
        });
        for amount in &amounts {
            let command = if *amount >= 0 {
                Command::MutableIncrement {
                    space: s.clone(),
                    namespace: "stats".into(),
                    key: "total".into(),
                    amount: JsonValue::from(*amount),
                }
            } else {
                Command::MutableDecrement {
                    space: s.clone(),
                    namespace: "stats".into(),
                    key: "total".into(),
                    amount: JsonValue::from(-*amount),
                }
            };
            run(&db, command);
        }
        let value = match run(&db, Command::MutableGet {
            space: s,
            namespace: "stats".into(),
            key: "total".into(),
        }) {
            Output::MaybeMutable(Some(r)) => r.value,
            other => panic!("Expected entry, got {:?}", other),
        };
        prop_assert_eq!(value, JsonValue::from(amounts.iter().sum::<i64>()));
    }

    #[test]
    fn immutable_versions_are_dense(k in 1usize..20, keep in 1usize..25) {
        let db = test_store();
        for i in 0..k {
            run(&db, Command::ImmutableStore {
                space: None,
                entry: ImmutableEntry::new("doc", "readme", JsonValue::from(i as i64)),
                expected_version: None,
            });
        }
        let versions = match run(&db, Command::ImmutableHistory {
            space: None,
            record_type: "doc".into(),
            id: "readme".into(),
        }) {
            Output::Immutables(v) => v,
            other => panic!("Expected Immutables, got {:?}", other),
        };
        let numbers: Vec<u64> = versions.iter().map(|r| r.history.version).collect();
        prop_assert_eq!(numbers, (1..=k as u64).collect::<Vec<_>>());

        match run(&db, Command::ImmutablePurgeVersions {
            space: None,
            record_type: "doc".into(),
            id: "readme".into(),
            keep_latest: keep,
        }) {
            Output::VersionsPurged(r) => {
                prop_assert_eq!(r.versions_remaining, k.min(keep));
                prop_assert_eq!(r.versions_purged, k - k.min(keep));
            }
            other => panic!("Expected VersionsPurged, got {:?}", other),
        }
    }

    #[test]
    fn spaces_never_share_memories(a in 0usize..8, b in 0usize..8) {
        let db = test_store();
        for i in 0..a {
            db.remember(&space("alpha"), StoreMemory::new(format!("alpha note {}", i))).unwrap();
        }
        for i in 0..b {
            db.remember(&space("beta"), StoreMemory::new(format!("beta note {}", i))).unwrap();
        }
        prop_assert_eq!(
            count(&db, Command::MemoryCount { space: space("alpha"), filter: MemoryFilter::default() }),
            a
        );
        prop_assert_eq!(
            count(&db, Command::MemoryCount { space: space("beta"), filter: MemoryFilter::default() }),
            b
        );
    }
}
