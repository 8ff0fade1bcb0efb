//! Search helpers shared by the primitives
//!
//! This module contains:
//! - `tokenizer`: keyword tokenization and term-overlap scoring
//! - `text`: substring / fuzzy matching and highlight windows
//! - `boost`: multiplicative re-weighting of ranked results

pub mod boost;
pub mod text;
pub mod tokenizer;

pub use boost::{BoostWeights, Boosted};
pub use text::{highlight, MatchMode, TextMatcher};
pub use tokenizer::{term_overlap, term_set, tokenize, tokenize_unique};
