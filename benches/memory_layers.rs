//! Memory Layer Benchmarks
//!
//! Hot paths of the layered store, measured directly on the engine
//! primitives (no command dispatch).
//!
//! ## What is measured
//! - Conversation appends and history paging
//! - Memory search, keyword and embedding
//! - Version chains: immutable writes and point-in-time reads
//! - Mutable counters and fact supersession
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench memory_layers
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cortex_core::{JsonValue, MemorySpaceId};
use cortex_engine::{
    ConversationStore, CortexConfig, CreateConversation, Database, FactStore, FactType,
    FactUpdate, HistoryOptions, ImmutableEntry, ImmutableStore, MemorySearch, MemoryStore,
    MutableStore, NewMessage, SetOptions, StoreFact, StoreMemory,
};
use cortex_security::{Environment, OpenOptions};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Test Utilities
// =============================================================================

fn open_db() -> Arc<Database> {
    Database::open(
        CortexConfig::for_environment(Environment::Test),
        OpenOptions::new().environment(Environment::Test),
    )
    .unwrap()
}

fn bench_space() -> MemorySpaceId {
    MemorySpaceId::from("bench-space")
}

/// Deterministic pseudo-random embedding
fn embedding(seed: usize, dims: usize) -> Vec<f32> {
    (0..dims)
        .map(|d| ((seed * 31 + d * 17) % 97) as f32 / 97.0 - 0.5)
        .collect()
}

const WORDS: [&str; 8] = [
    "deploy", "budget", "coffee", "retry", "invoice", "garden", "latency", "holiday",
];

fn sentence(i: usize) -> String {
    format!(
        "{} {} note number {}",
        WORDS[i % WORDS.len()],
        WORDS[(i / WORDS.len()) % WORDS.len()],
        i
    )
}

// =============================================================================
// Conversations
// =============================================================================

fn conversation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversation");
    let db = open_db();
    let store = ConversationStore::new(db);
    let space = bench_space();

    let conv = store
        .create(CreateConversation::user_agent(space.clone(), "user-1", "assistant"))
        .unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("add_message", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            store
                .add_message(&space, &conv.conversation_id, NewMessage::user(sentence(i)))
                .unwrap()
        });
    });

    let full = store
        .create(CreateConversation::user_agent(space.clone(), "user-2", "assistant"))
        .unwrap();
    for i in 0..1_000 {
        store
            .add_message(&space, &full.conversation_id, NewMessage::user(sentence(i)))
            .unwrap();
    }
    for limit in [10usize, 100] {
        group.bench_with_input(BenchmarkId::new("history_page", limit), &limit, |b, &limit| {
            let options = HistoryOptions {
                offset: 500,
                limit: Some(limit),
                ..Default::default()
            };
            b.iter(|| {
                black_box(
                    store
                        .get_history(&space, &full.conversation_id, &options)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

// =============================================================================
// Memory Search
// =============================================================================

fn memory_search_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_search");
    group.throughput(Throughput::Elements(1));

    for count in [1_000usize, 10_000] {
        let db = open_db();
        let store = MemoryStore::new(db);
        let space = bench_space();
        for i in 0..count {
            store
                .store(&space, StoreMemory::new(sentence(i)).embedding(embedding(i, 64)))
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::new("keyword", count), &count, |b, _| {
            let search = MemorySearch::new("deploy latency").limit(10);
            b.iter(|| black_box(store.search(&space, &search).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("embedding_64d", count), &count, |b, _| {
            let search = MemorySearch::by_embedding(embedding(7, 64)).limit(10);
            b.iter(|| black_box(store.search(&space, &search).unwrap()));
        });
    }

    group.finish();
}

// =============================================================================
// Version Chains
// =============================================================================

fn version_chain_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("version_chain");

    group.throughput(Throughput::Elements(1));
    group.bench_function("immutable_store_next_version", |b| {
        let store = ImmutableStore::new(open_db());
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            store
                .store(None, ImmutableEntry::new("doc", "hot", JsonValue::from(i)))
                .unwrap()
        });
    });

    for versions in [10usize, 100, 1_000] {
        let db = open_db();
        let store = ImmutableStore::new(db.clone());
        let mut first_at = 0;
        for i in 0..versions {
            let record = store
                .store(None, ImmutableEntry::new("doc", "chain", JsonValue::from(i as i64)))
                .unwrap();
            if i == 0 {
                first_at = record.updated_at;
            }
        }

        group.bench_with_input(
            BenchmarkId::new("get_at_oldest", versions),
            &versions,
            |b, _| {
                b.iter(|| {
                    black_box(
                        store
                            .get_at_timestamp(None, "doc", "chain", black_box(first_at))
                            .unwrap(),
                    )
                })
            },
        );
        group.bench_with_input(BenchmarkId::new("history", versions), &versions, |b, _| {
            b.iter(|| black_box(store.get_history(None, "doc", "chain").unwrap()))
        });
    }

    group.finish();
}

// =============================================================================
// Mutable State and Facts
// =============================================================================

fn mutable_and_fact_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutable_and_facts");
    group.throughput(Throughput::Elements(1));

    let db = open_db();
    let space = bench_space();
    let mutable = MutableStore::new(db.clone());
    mutable
        .set(&space, "counters", "hits", JsonValue::from(0i64), SetOptions::default())
        .unwrap();
    group.bench_function("mutable_increment", |b| {
        b.iter(|| mutable.increment(&space, "counters", "hits", 1i64).unwrap())
    });

    let facts = FactStore::new(db);
    let mut current = facts
        .store(
            &space,
            StoreFact::new("user likes tea", FactType::Preference, 80).triple("user", "likes", "tea"),
        )
        .unwrap();
    group.bench_function("fact_supersede_by_update", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            current = facts
                .update(
                    &space,
                    &current.fact_id,
                    FactUpdate {
                        object: Some(format!("tea-{}", i)),
                        ..Default::default()
                    },
                    None,
                )
                .unwrap();
        })
    });

    group.finish();
}

criterion_group!(
    name = layers;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = conversation_benchmarks, mutable_and_fact_benchmarks
);

criterion_group!(
    name = search;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(20);
    targets = memory_search_benchmarks, version_chain_benchmarks
);

criterion_main!(layers, search);
