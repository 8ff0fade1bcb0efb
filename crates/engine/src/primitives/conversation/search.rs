//! Linear-scan conversation search
//!
//! A conversation scores `matched_messages / total_messages`, plus a fixed
//! boost when its metadata matches. Conversations with neither a message nor
//! a metadata hit are dropped.

use std::cmp::Ordering;

use cortex_core::json::metadata_contains_text;

use super::types::{ConversationRecord, ConversationSearchHit};
use crate::search::{highlight, TextMatcher};

/// Scoring parameters taken from the search config
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConversationScoring {
    pub metadata_boost: f64,
    pub highlight_radius: usize,
}

/// Score one conversation; None if nothing matched
pub(crate) fn score_conversation(
    record: &ConversationRecord,
    matcher: &TextMatcher,
    search_metadata: bool,
    scoring: ConversationScoring,
) -> Option<ConversationSearchHit> {
    let mut matched_messages = Vec::new();
    let mut highlights = Vec::new();
    for message in &record.messages {
        if let Some(range) = matcher.find(&message.content) {
            highlights.push(highlight(&message.content, range, scoring.highlight_radius));
            matched_messages.push(message.clone());
        }
    }

    let metadata_match = search_metadata
        && record
            .metadata
            .as_ref()
            .map_or(false, |m| metadata_contains_text(m, &matcher.query_lower()));

    if matched_messages.is_empty() && !metadata_match {
        return None;
    }

    let mut score = if record.messages.is_empty() {
        0.0
    } else {
        matched_messages.len() as f64 / record.messages.len() as f64
    };
    if metadata_match {
        score += scoring.metadata_boost;
    }

    Some(ConversationSearchHit {
        conversation: record.clone(),
        matched_messages,
        highlights,
        score,
        metadata_match,
    })
}

/// Best score first, then most recently updated
pub(crate) fn rank(hits: &mut [ConversationSearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.conversation.updated_at.cmp(&a.conversation.updated_at))
    });
}
