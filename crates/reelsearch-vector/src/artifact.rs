use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reelsearch_core::cache::CollectionFingerprint;
use reelsearch_core::types::DocId;

pub const EMBEDDINGS_ARTIFACT: &str = "embeddings.json";

/// Which chunk of which document a stored vector belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub doc_id: DocId,
    pub chunk_index: usize,
}

/// On-disk form of the vector index: one array of vectors plus what is
/// needed to tell whether it still matches the collection and the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingArtifact {
    pub fingerprint: CollectionFingerprint,
    pub embedder_id: String,
    pub dim: usize,
    pub built_at: DateTime<Utc>,
    pub chunks: Vec<ChunkRef>,
    pub vectors: Vec<Vec<f32>>,
}

impl EmbeddingArtifact {
    /// Reason the artifact cannot serve the given collection/model, if any.
    pub fn staleness(
        &self,
        fingerprint: &CollectionFingerprint,
        expected_vectors: usize,
        embedder_id: &str,
        dim: usize,
    ) -> Option<String> {
        if self.vectors.len() != expected_vectors || self.chunks.len() != self.vectors.len() {
            return Some(format!("{} vectors cached, {expected_vectors} expected", self.vectors.len()));
        }
        if self.fingerprint != *fingerprint {
            return Some(format!(
                "collection changed ({} docs cached, {} now)",
                self.fingerprint.doc_count, fingerprint.doc_count
            ));
        }
        if self.embedder_id != embedder_id || self.dim != dim {
            return Some(format!("embedder changed ({} -> {embedder_id})", self.embedder_id));
        }
        if let Some(bad) = self.vectors.iter().find(|v| v.len() != self.dim) {
            return Some(format!("vector of dimension {} in a d{} index", bad.len(), self.dim));
        }
        None
    }
}
