//! Cosine similarity for memory search.
//!
//! Scores are "higher = more similar", in `[-1, 1]`. Vectors are used as
//! given; nothing is normalized on store.
//!
//! A zero vector has no direction, so it scores 0 against anything. Pairs
//! that cannot be compared (dimension mismatch, NaN or infinite components)
//! produce no score at all and are left out of the ranking.

/// Cosine similarity: `dot(a, b) / (|a| * |b|)`
///
/// Returns 0.0 if either vector has zero norm. The caller must ensure the
/// lengths match; see [`similarity`] for the checked form.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in cosine similarity");

    let mut dot = 0.0f32;
    let mut norm_a_sq = 0.0f32;
    let mut norm_b_sq = 0.0f32;

    for (ai, bi) in a.iter().zip(b.iter()) {
        dot += ai * bi;
        norm_a_sq += ai * ai;
        norm_b_sq += bi * bi;
    }

    let norm_a = norm_a_sq.sqrt();
    let norm_b = norm_b_sq.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Rankable similarity between a query and a stored embedding
///
/// Returns None when the pair must be excluded from ranking: lengths differ,
/// either side is empty, or the result is not finite.
pub fn similarity(query: &[f32], candidate: &[f32]) -> Option<f64> {
    if query.is_empty() || query.len() != candidate.len() {
        return None;
    }
    let score = cosine_similarity(query, candidate);
    if score.is_finite() {
        // Rounding can push parallel vectors a hair past 1.
        Some(f64::from(score.clamp(-1.0, 1.0)))
    } else {
        None
    }
}
