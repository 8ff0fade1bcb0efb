//! Memory ranking
//!
//! Two raw scorers feed one pipeline:
//! - similarity: cosine between the query embedding and the stored one;
//!   memories without a comparable embedding are skipped
//! - keyword: fraction of query terms found in `content` and
//!   `enriched_content`; memories with no term in common are skipped
//!
//! Raw scores are then boosted, sorted, cut at `min_score` and truncated to
//! `limit`, in that order.

use std::cmp::Ordering;

use super::distance::similarity;
use super::types::{MemoryRecord, MemorySearch, MemorySearchHit};
use crate::search::{term_overlap, term_set, tokenize_unique, BoostWeights};

/// How a query scores candidates
pub(crate) enum Scorer {
    Similarity(Vec<f32>),
    /// Query terms; empty means "match everything"
    Keywords(Vec<String>),
    /// Stopword-only query, matched as a lowercase substring
    Substring(String),
}

impl Scorer {
    pub(crate) fn for_search(search: &MemorySearch) -> Self {
        if let Some(embedding) = &search.embedding {
            return Scorer::Similarity(embedding.clone());
        }
        let query = search.query.trim();
        let terms = tokenize_unique(query);
        if terms.is_empty() && !query.is_empty() {
            Scorer::Substring(query.to_lowercase())
        } else {
            Scorer::Keywords(terms)
        }
    }

    /// Raw score, or None if the memory is not a match
    pub(crate) fn score(&self, memory: &MemoryRecord) -> Option<f64> {
        match self {
            Scorer::Similarity(query) => similarity(query, memory.embedding.as_deref()?),
            Scorer::Keywords(terms) if terms.is_empty() => Some(1.0),
            Scorer::Keywords(terms) => {
                let doc = term_set(
                    std::iter::once(memory.content.as_str())
                        .chain(memory.enriched_content.as_deref()),
                );
                let score = term_overlap(terms, &doc);
                (score > 0.0).then_some(score)
            }
            Scorer::Substring(needle) => {
                let hit = memory.content.to_lowercase().contains(needle.as_str())
                    || memory
                        .enriched_content
                        .as_deref()
                        .map_or(false, |e| e.to_lowercase().contains(needle.as_str()));
                hit.then_some(1.0)
            }
        }
    }
}

/// Boost, sort, apply `min_score`, then `limit`
pub(crate) fn rank(
    scored: Vec<(MemoryRecord, f64)>,
    search: &MemorySearch,
    weights: &BoostWeights,
    default_limit: usize,
) -> Vec<MemorySearchHit> {
    let category = search.query_category.as_deref();
    let mut hits: Vec<MemorySearchHit> = scored
        .into_iter()
        .map(|(memory, raw)| {
            let score = weights.apply(raw, &memory, category);
            MemorySearchHit { memory, score }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.memory.importance.cmp(&a.memory.importance))
            .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
            .then_with(|| a.memory.memory_id.cmp(&b.memory.memory_id))
    });

    if let Some(min) = search.min_score {
        hits.retain(|h| h.score >= min);
    }
    hits.truncate(search.limit.unwrap_or(default_limit));
    hits
}
