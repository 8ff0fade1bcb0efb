//! Post-ranking re-weighting.
//!
//! Raw relevance scores are multiplied by fixed factors, then the list is
//! re-sorted. Callers apply any `min_score` cutoff and `limit` afterwards, so
//! a boost can lift a result over the cutoff.

use crate::config::SearchConfig;

/// Multipliers applied to matching results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostWeights {
    /// Applied when the result was authored by a user.
    pub user_role: f64,
    /// Applied when the result's category matches the query's.
    pub category: f64,
    /// Applied when the result carries enriched content.
    pub enrichment: f64,
}

impl Default for BoostWeights {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for BoostWeights {
    fn from(cfg: &SearchConfig) -> Self {
        Self {
            user_role: cfg.user_role_boost,
            category: cfg.category_boost,
            enrichment: cfg.enrichment_boost,
        }
    }
}

/// Signals a candidate exposes to the booster.
pub trait Boosted {
    /// True if a user authored the content.
    fn is_user_authored(&self) -> bool;
    /// Category of the candidate, if any.
    fn category(&self) -> Option<&str>;
    /// True if enriched content is present.
    fn is_enriched(&self) -> bool;
}

impl BoostWeights {
    /// Boosted score: `score * Π(matching multipliers)`.
    pub fn apply<T: Boosted>(&self, score: f64, item: &T, query_category: Option<&str>) -> f64 {
        let mut boosted = score;
        if item.is_user_authored() {
            boosted *= self.user_role;
        }
        if let (Some(want), Some(have)) = (query_category, item.category()) {
            if want == have {
                boosted *= self.category;
            }
        }
        if item.is_enriched() {
            boosted *= self.enrichment;
        }
        boosted
    }
}
