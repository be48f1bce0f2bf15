//! Scoring adapters.

mod keyword_scorer;

pub use keyword_scorer::KeywordScorer;
