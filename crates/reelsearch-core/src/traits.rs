use async_trait::async_trait;

use crate::error::Result;

/// Text embedding provider. Vectors are fixed-dimension for a given `id`.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g., `bert:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Local relevance model scoring `(query, candidate_text)` pairs directly.
pub trait CrossEncoder: Send + Sync {
    fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f32>>;
}

/// External text-generation judge: prompt in, raw text out.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn judge(&self, prompt: &str) -> Result<String>;
}
