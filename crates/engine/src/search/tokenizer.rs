//! Text tokenizer for keyword scoring
//!
//! Pipeline: lowercase → split on non-alphanumeric → filter short tokens
//!           → remove stopwords

use rustc_hash::FxHashSet;

/// Standard English stopwords (Lucene's default set).
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

#[inline]
fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Tokenize text into searchable terms.
///
/// # Example
///
/// ```
/// use cortex_engine::search::tokenize;
///
/// let tokens = tokenize("The user prefers Dark mode");
/// assert_eq!(tokens, vec!["user", "prefers", "dark", "mode"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() >= 2)
        .filter(|s| !is_stopword(s))
        .map(str::to_string)
        .collect()
}

/// Tokenize and deduplicate, preserving first-seen order.
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Set of terms in a document, for overlap scoring.
pub fn term_set<'a>(texts: impl IntoIterator<Item = &'a str>) -> FxHashSet<String> {
    texts.into_iter().flat_map(tokenize).collect()
}

/// Fraction of query terms present in a document's term set.
///
/// Returns 0.0 for an empty query.
pub fn term_overlap(query_terms: &[String], doc_terms: &FxHashSet<String>) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let matched = query_terms.iter().filter(|t| doc_terms.contains(*t)).count();
    matched as f64 / query_terms.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(tokenize("Hello, World!"), vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_filters_short_and_stopwords() {
        assert_eq!(tokenize("I am a test of the system"), vec!["am", "test", "system"]);
    }

    #[test]
    fn test_tokenize_numbers_and_unicode() {
        assert_eq!(tokenize("order 42 café"), vec!["order", "42", "café"]);
    }

    #[test]
    fn test_tokenize_empty_and_punctuation() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("...---...").is_empty());
        assert!(tokenize("the a an is").is_empty());
    }

    #[test]
    fn test_tokenize_unique_preserves_order() {
        assert_eq!(
            tokenize_unique("apple banana Apple cherry"),
            vec!["apple", "banana", "cherry"]
        );
    }

    #[test]
    fn test_term_overlap() {
        let doc = term_set(["user likes dark mode", "enriched: theme"]);
        let q = tokenize_unique("dark theme preference");
        let score = term_overlap(&q, &doc);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(term_overlap(&[], &doc), 0.0);
    }
}
