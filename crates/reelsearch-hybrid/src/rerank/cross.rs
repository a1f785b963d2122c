use tracing::debug;

use reelsearch_core::traits::CrossEncoder;
use reelsearch_core::{Error, Result};

use super::{Candidate, RerankSignal, RerankedHit};

/// Score every `(query, title - body)` pair in one local batch.
pub fn rerank_cross_encoder(
    encoder: &dyn CrossEncoder,
    query: &str,
    candidates: Vec<Candidate>,
    limit: usize,
) -> Result<Vec<RerankedHit>> {
    let pairs: Vec<(String, String)> = candidates.iter().map(|c| (query.to_string(), c.judged_text())).collect();
    let scores = encoder.score_pairs(&pairs)?;
    if scores.len() != candidates.len() {
        return Err(Error::Embedding(format!("cross-encoder returned {} scores for {} pairs", scores.len(), candidates.len())));
    }
    debug!(pairs = pairs.len(), "cross-encoder scored candidates");

    let mut scored: Vec<(f32, Candidate)> = scores.into_iter().zip(candidates).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(scored
        .into_iter()
        .take(limit)
        .map(|(score, candidate)| RerankedHit { candidate, signal: RerankSignal::CrossEncoder(score) })
        .collect())
}
