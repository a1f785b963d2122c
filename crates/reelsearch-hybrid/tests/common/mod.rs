#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reelsearch_core::config::{FusionSettings, LexicalSettings, RerankSettings, VectorSettings};
use reelsearch_core::traits::{Embedder, RelevanceJudge};
use reelsearch_core::types::{Document, FusedHit};
use reelsearch_core::{Error, Result};
use reelsearch_hybrid::{Candidate, HybridSearchEngine, Reranker};
use reelsearch_text::{InvertedIndex, Normalizer};
use reelsearch_vector::VectorIndex;

pub fn doc(id: u64, title: &str, body: &str) -> Document {
    Document { id, title: title.to_string(), body: body.to_string(), metadata: Default::default() }
}

/// Doc 1 holds "space" and "adventure", doc 2 only "space", doc 3 neither.
pub fn toy_collection() -> Vec<Document> {
    vec![
        doc(1, "Star Voyage", "A space adventure across the galaxy."),
        doc(2, "Orbit", "Life aboard a space station."),
        doc(3, "Farm Days", "A quiet story about a farmer."),
    ]
}

/// Fixed 2-d vectors: any query embeds to `[1, 0]` and the documents sit at
/// cosine 0.8 (doc 1), 0.9 (doc 2) and 0.3 (doc 3) from it.
pub struct TableEmbedder;

impl Embedder for TableEmbedder {
    fn id(&self) -> &str { "table" }
    fn dim(&self) -> usize { 2 }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let cos: f32 = if t.starts_with("Star Voyage:") {
                    0.8
                } else if t.starts_with("Orbit:") {
                    0.9
                } else if t.starts_with("Farm Days:") {
                    0.3
                } else {
                    1.0
                };
                vec![cos, (1.0 - cos * cos).sqrt()]
            })
            .collect())
    }
}

pub fn fast_rerank_settings() -> RerankSettings {
    RerankSettings { min_delay_ms: 0, timeout_ms: 2_000, ..RerankSettings::default() }
}

pub fn engine(reranker: Reranker) -> HybridSearchEngine {
    let docs = toy_collection();
    let engine = HybridSearchEngine::new(FusionSettings::default(), reranker);
    engine.publish_lexical(InvertedIndex::build(Normalizer::default(), LexicalSettings::default(), &docs));
    engine.publish_vector(VectorIndex::build(Arc::new(TableEmbedder), &VectorSettings::default(), &docs).unwrap());
    engine
}

pub fn candidates() -> Vec<Candidate> {
    toy_collection()
        .into_iter()
        .enumerate()
        .map(|(i, document)| Candidate {
            fused: FusedHit { doc_id: document.id, lexical: None, semantic: None, fused_score: 1.0 / (i as f64 + 1.0) },
            document,
        })
        .collect()
}

/// Judge whose reply is computed from the prompt. Optionally sleeps before
/// answering and tracks how many calls overlap.
pub struct ScriptedJudge<F> {
    reply: F,
    delay: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl<F> ScriptedJudge<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    pub fn new(reply: F) -> Self {
        Self::slow(Duration::ZERO, reply)
    }

    pub fn slow(delay: Duration, reply: F) -> Self {
        Self { reply, delay, calls: AtomicUsize::new(0), in_flight: AtomicUsize::new(0), max_in_flight: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl<F> RelevanceJudge for ScriptedJudge<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    async fn judge(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.reply)(prompt)
    }
}

/// Pointwise reply keyed on the movie title in the prompt.
pub fn score_by_title(prompt: &str) -> Result<String> {
    let score = if prompt.contains("Movie: Farm Days") {
        "9"
    } else if prompt.contains("Movie: Star Voyage") || prompt.contains("Movie: Orbit") {
        "5"
    } else {
        return Err(Error::JudgeParse("unexpected prompt".into()));
    };
    Ok(score.to_string())
}
