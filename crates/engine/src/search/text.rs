//! Text matching and highlighting for linear-scan search.
//!
//! Three match modes:
//! - `Contains`: case-insensitive substring
//! - `Exact`: case-sensitive substring
//! - `Fuzzy`: every query word matches some text word, either by
//!   containment or within one edit

use serde::{Deserialize, Serialize};
use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// How a query is matched against text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case-insensitive substring (default)
    #[default]
    Contains,
    /// Case-sensitive substring
    Exact,
    /// Word-level fuzzy match
    Fuzzy,
}

/// A compiled query
#[derive(Debug, Clone)]
pub struct TextMatcher {
    mode: MatchMode,
    query: String,
    folded: Vec<char>,
    words: Vec<Vec<char>>,
}

impl TextMatcher {
    /// Compile a query for the given mode
    pub fn new(query: &str, mode: MatchMode) -> Self {
        Self {
            mode,
            query: query.to_string(),
            folded: query.chars().map(fold).collect(),
            words: words(query).map(|(_, w)| w.chars().map(fold).collect()).collect(),
        }
    }

    /// Lowercased query, for metadata matching
    pub fn query_lower(&self) -> String {
        self.query.to_lowercase()
    }

    /// Byte range of the first match in `text`
    pub fn find(&self, text: &str) -> Option<Range<usize>> {
        match self.mode {
            MatchMode::Contains => find_folded(text, &self.folded),
            MatchMode::Exact => {
                if self.query.is_empty() {
                    return None;
                }
                text.find(&self.query).map(|s| s..s + self.query.len())
            }
            MatchMode::Fuzzy => self.find_fuzzy(text),
        }
    }

    fn find_fuzzy(&self, text: &str) -> Option<Range<usize>> {
        if self.words.is_empty() {
            return None;
        }
        let text_words: Vec<(Range<usize>, Vec<char>)> = words(text)
            .map(|(start, w)| (start..start + w.len(), w.chars().map(fold).collect()))
            .collect();

        let mut first: Option<Range<usize>> = None;
        for qw in &self.words {
            let hit = text_words
                .iter()
                .find(|(_, tw)| contains_chars(tw, qw) || within_one_edit(tw, qw))?;
            if first.is_none() {
                first = Some(hit.0.clone());
            }
        }
        first
    }
}

/// Case fold one character
#[inline]
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Alphanumeric words with their byte offsets
fn words(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_word_bound_indices()
        .filter(|(_, w)| w.chars().any(char::is_alphanumeric))
}

fn find_folded(haystack: &str, needle: &[char]) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    let chars: Vec<(usize, char)> = haystack.char_indices().collect();
    if needle.len() > chars.len() {
        return None;
    }
    (0..=chars.len() - needle.len())
        .find(|&i| (0..needle.len()).all(|j| fold(chars[i + j].1) == needle[j]))
        .map(|i| {
            let start = chars[i].0;
            let end = chars
                .get(i + needle.len())
                .map(|(b, _)| *b)
                .unwrap_or(haystack.len());
            start..end
        })
}

fn contains_chars(hay: &[char], needle: &[char]) -> bool {
    needle.len() <= hay.len() && hay.windows(needle.len()).any(|w| w == needle)
}

/// True if `a` and `b` differ by at most one insertion, deletion or
/// substitution
pub fn within_one_edit(a: &[char], b: &[char]) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if long.len() - short.len() > 1 {
        return false;
    }
    let prefix = short.iter().zip(long).take_while(|(x, y)| x == y).count();
    if short.len() == long.len() {
        short[prefix..].iter().skip(1).eq(long[prefix..].iter().skip(1))
    } else {
        short[prefix..] == long[prefix + 1..]
    }
}

/// Window of `radius` graphemes on either side of `range`
///
/// Truncated ends are marked with `...`.
pub fn highlight(text: &str, range: Range<usize>, radius: usize) -> String {
    let bounds: Vec<usize> = text
        .grapheme_indices(true)
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let last = bounds.len() - 1;

    let start_idx = bounds.partition_point(|&b| b < range.start);
    let end_idx = bounds.partition_point(|&b| b < range.end).min(last);
    let from = bounds[start_idx.saturating_sub(radius)];
    let to = bounds[(end_idx + radius).min(last)];

    let mut out = String::with_capacity(to - from + 6);
    if from > 0 {
        out.push_str("...");
    }
    out.push_str(&text[from..to]);
    if to < text.len() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let m = TextMatcher::new("DARK mode", MatchMode::Contains);
        assert_eq!(m.find("I like dark Mode a lot"), Some(7..16));
        assert_eq!(m.find("light"), None);
    }

    #[test]
    fn test_exact_is_case_sensitive() {
        let m = TextMatcher::new("Dark", MatchMode::Exact);
        assert_eq!(m.find("dark Dark"), Some(5..9));
        assert_eq!(m.find("dark"), None);
    }

    #[test]
    fn test_fuzzy_tolerates_typos_and_stems() {
        let m = TextMatcher::new("pasword reset", MatchMode::Fuzzy);
        assert!(m.find("How do I reset my password?").is_some());

        let m = TextMatcher::new("deploy", MatchMode::Fuzzy);
        assert!(m.find("we were deploying yesterday").is_some());

        let m = TextMatcher::new("billing invoice", MatchMode::Fuzzy);
        assert!(m.find("billing question").is_none());
    }

    #[test]
    fn test_empty_query_never_matches() {
        for mode in [MatchMode::Contains, MatchMode::Exact, MatchMode::Fuzzy] {
            assert_eq!(TextMatcher::new("", mode).find("anything"), None);
        }
    }

    #[test]
    fn test_within_one_edit() {
        assert!(within_one_edit(&chars("cat"), &chars("cat")));
        assert!(within_one_edit(&chars("cat"), &chars("cut")));
        assert!(within_one_edit(&chars("cat"), &chars("cats")));
        assert!(within_one_edit(&chars("cat"), &chars("at")));
        assert!(!within_one_edit(&chars("cat"), &chars("dog")));
        assert!(!within_one_edit(&chars("cat"), &chars("catsup")));
    }

    #[test]
    fn test_highlight_window() {
        let text = "0123456789abcdefghij";
        assert_eq!(highlight(text, 10..11, 3), "...789abcd...");
        assert_eq!(highlight(text, 0..1, 3), "0123...");
        assert_eq!(highlight(text, 19..20, 3), "...ghij");
        assert_eq!(highlight("short", 0..5, 30), "short");
    }

    #[test]
    fn test_highlight_respects_multibyte_text() {
        let text = "héllo wörld ünïcode";
        let m = TextMatcher::new("WÖRLD", MatchMode::Contains);
        let range = m.find(text).unwrap();
        assert_eq!(&text[range.clone()], "wörld");
        assert_eq!(highlight(text, range, 2), "...o wörld ü...");
    }
}
