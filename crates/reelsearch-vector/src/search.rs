use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use reelsearch_core::types::{DocId, ScoredHit, SourceKind};
use reelsearch_core::{Error, Result};

use crate::index::VectorIndex;

/// Cosine similarity; `0.0` when either side has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

impl VectorIndex {
    /// Embed `query` with the index's embedder and rank documents by similarity.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredHit>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyInput("query is blank".into()));
        }
        let mut embedded = self.embedder.embed_batch(&[query.to_string()])?;
        let vector = embedded
            .pop()
            .ok_or_else(|| Error::Embedding("embedder returned no vector for the query".into()))?;
        self.search_embedding(&vector, limit)
    }

    /// Rank documents against an already embedded query (text, image, ...).
    /// Chunks of the same document collapse to their best similarity.
    pub fn search_embedding(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredHit>> {
        if vector.len() != self.dim() {
            return Err(Error::InvalidArgument(format!(
                "query vector has dimension {}, index has {}",
                vector.len(),
                self.dim()
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let scored: Vec<(DocId, f32)> = self
            .artifact
            .vectors
            .par_iter()
            .zip(self.artifact.chunks.par_iter())
            .map(|(v, chunk)| (chunk.doc_id, cosine_similarity(vector, v)))
            .collect();

        let mut best: BTreeMap<DocId, f32> = BTreeMap::new();
        for (doc_id, sim) in scored {
            best.entry(doc_id).and_modify(|s| *s = s.max(sim)).or_insert(sim);
        }

        // ties keep ascending id order from the map
        let mut ranked: Vec<(DocId, f32)> = best.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(limit);
        debug!(hits = ranked.len(), "vector search");

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(i, (doc_id, sim))| ScoredHit { doc_id, rank: i + 1, score: f64::from(sim), source: SourceKind::Semantic })
            .collect())
    }
}
