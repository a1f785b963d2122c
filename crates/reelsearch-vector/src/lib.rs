//! reelsearch-vector
//!
//! Per-chunk embedding vectors for a collection, cached as a single JSON
//! artifact and searched by cosine similarity with per-document dedup.

pub mod artifact;
pub mod index;
pub mod search;

pub use artifact::{ChunkRef, EmbeddingArtifact, EMBEDDINGS_ARTIFACT};
pub use index::VectorIndex;
pub use search::cosine_similarity;
