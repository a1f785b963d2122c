//! reelsearch-text
//!
//! Lexical side of retrieval: the token normalizer, the inverted index with
//! its on-disk artifacts, and BM25-style term-overlap search.

pub mod tantivy_utils;
pub mod normalize;
pub mod index;
pub mod search;

pub use index::InvertedIndex;
pub use normalize::Normalizer;
pub use search::LexicalOrder;
