use std::sync::Arc;
use tracing::{info, warn};

use reelsearch_core::cache::{ArtifactStore, Published};
use reelsearch_core::config::{FusionSettings, Settings};
use reelsearch_core::traits::Embedder;
use reelsearch_core::types::{DocId, Document, FusedHit, ScoredHit};
use reelsearch_core::{Error, Result};
use reelsearch_text::{InvertedIndex, Normalizer};
use reelsearch_vector::VectorIndex;

use crate::evaluate;
use crate::fusion;
use crate::rerank::{Candidate, RerankStrategy, RerankedHit, Reranker};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FusionMethod {
    Weighted { alpha: f64 },
    Rrf { k: u32 },
}

/// Result of the full retrieve-fuse-rerank pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub hits: Vec<RerankedHit>,
    /// Set when reranking failed and `hits` is the fused order instead.
    pub degraded: Option<String>,
}

/// Query facade over the lexical and vector indices, fusion and reranking.
///
/// Indices live in publish slots: they are built or loaded off to the side
/// and swapped in whole, so a query sees either no index (`IndexNotReady`)
/// or a complete one.
pub struct HybridSearchEngine {
    lexical: Published<InvertedIndex>,
    vector: Published<VectorIndex>,
    reranker: Reranker,
    fusion: FusionSettings,
}

impl HybridSearchEngine {
    pub fn new(fusion: FusionSettings, reranker: Reranker) -> Self {
        Self {
            lexical: Published::empty("lexical index"),
            vector: Published::empty("vector index"),
            reranker,
            fusion,
        }
    }

    pub fn publish_lexical(&self, index: InvertedIndex) {
        info!(documents = index.len(), "publishing lexical index");
        self.lexical.publish(index);
    }

    pub fn publish_vector(&self, index: VectorIndex) {
        info!(vectors = index.len(), "publishing vector index");
        self.vector.publish(index);
    }

    /// Load both indices from the cache dir (rebuilding stale ones) in
    /// parallel, then publish them.
    pub fn load_or_build(
        &self,
        settings: &Settings,
        documents: &[Document],
        normalizer: Normalizer,
        embedder: Arc<dyn Embedder>,
    ) -> Result<()> {
        let store = ArtifactStore::new(settings.data.cache_dir());
        let (lexical, vector) = rayon::join(
            || InvertedIndex::load_or_build(normalizer, settings.lexical.clone(), &store, documents),
            || VectorIndex::load_or_build(embedder, &settings.vector, &store, documents),
        );
        self.publish_lexical(lexical?);
        self.publish_vector(vector?);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.lexical.is_ready() && self.vector.is_ready()
    }

    pub fn search_lexical(&self, query: &str, limit: usize) -> Result<Vec<ScoredHit>> {
        self.lexical.get()?.search(query, limit)
    }

    pub fn search_vector(&self, query: &str, limit: usize) -> Result<Vec<ScoredHit>> {
        self.vector.get()?.search(query, limit)
    }

    /// Vector search with an embedding computed elsewhere (e.g. from an image).
    pub fn search_embedding(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredHit>> {
        self.vector.get()?.search_embedding(vector, limit)
    }

    pub fn get_documents(&self, term: &str) -> Result<Vec<DocId>> {
        self.lexical.get()?.get_documents(term)
    }

    pub fn document(&self, id: DocId) -> Result<Option<Document>> {
        Ok(self.lexical.get()?.document(id).cloned())
    }

    /// Both ranked lists at `limit * overfetch_factor`, retrieved in parallel.
    fn retrieve(&self, query: &str, limit: usize) -> Result<(Vec<ScoredHit>, Vec<ScoredHit>)> {
        if query.trim().is_empty() {
            return Err(Error::EmptyInput("query is blank".into()));
        }
        let lexical = self.lexical.get()?;
        let vector = self.vector.get()?;
        let fetch = limit.saturating_mul(self.fusion.overfetch_factor);
        let (lex, sem) = rayon::join(|| lexical.search(query, fetch), || vector.search(query, fetch));
        Ok((lex?, sem?))
    }

    pub fn fuse_weighted(&self, query: &str, alpha: f64, limit: usize) -> Result<Vec<FusedHit>> {
        fusion::check_alpha(alpha)?;
        let (lexical, semantic) = self.retrieve(query, limit)?;
        fusion::fuse_weighted(&lexical, &semantic, alpha, limit)
    }

    pub fn fuse_rrf(&self, query: &str, k: u32, limit: usize) -> Result<Vec<FusedHit>> {
        let (lexical, semantic) = self.retrieve(query, limit)?;
        Ok(fusion::fuse_rrf(&lexical, &semantic, k, limit))
    }

    pub fn fuse(&self, query: &str, method: FusionMethod, limit: usize) -> Result<Vec<FusedHit>> {
        match method {
            FusionMethod::Weighted { alpha } => self.fuse_weighted(query, alpha, limit),
            FusionMethod::Rrf { k } => self.fuse_rrf(query, k, limit),
        }
    }

    /// Attach documents to fused hits for the judges to read.
    pub fn candidates(&self, fused: Vec<FusedHit>) -> Result<Vec<Candidate>> {
        let lexical = self.lexical.get()?;
        fused
            .into_iter()
            .map(|hit| {
                let document = lexical
                    .document(hit.doc_id)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(format!("document {} is not in the collection", hit.doc_id)))?;
                Ok(Candidate { fused: hit, document })
            })
            .collect()
    }

    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        strategy: RerankStrategy,
        limit: usize,
    ) -> Result<Vec<RerankedHit>> {
        self.reranker.rerank(query, candidates, strategy, limit).await
    }

    /// Fuse, then rerank `limit * candidate_factor` candidates down to `limit`.
    /// A failing judge degrades to the fused order; index errors propagate.
    pub async fn search_and_rerank(
        &self,
        query: &str,
        method: FusionMethod,
        strategy: Option<RerankStrategy>,
        limit: usize,
    ) -> Result<PipelineOutcome> {
        let Some(strategy) = strategy else {
            let candidates = self.candidates(self.fuse(query, method, limit)?)?;
            let hits = candidates.into_iter().map(RerankedHit::unjudged).collect();
            return Ok(PipelineOutcome { hits, degraded: None });
        };

        let pool = limit.saturating_mul(self.reranker.settings().candidate_factor);
        let candidates = self.candidates(self.fuse(query, method, pool)?)?;
        match self.reranker.rerank(query, candidates.clone(), strategy, limit).await {
            Ok(hits) => Ok(PipelineOutcome { hits, degraded: None }),
            Err(e) if e.is_judge_failure() || matches!(e, Error::Embedding(_)) => {
                warn!(%strategy, error = %e, "rerank failed, falling back to fused order");
                let hits = candidates.into_iter().take(limit).map(RerankedHit::unjudged).collect();
                Ok(PipelineOutcome { hits, degraded: Some(format!("{strategy} rerank failed: {e}")) })
            }
            Err(e) => Err(e),
        }
    }

    /// Grade a final result list 0-3 with the configured judge.
    pub async fn evaluate(&self, query: &str, hits: &[RerankedHit]) -> Result<Vec<Option<u8>>> {
        let results: Vec<Candidate> = hits.iter().map(|h| h.candidate.clone()).collect();
        evaluate::evaluate(self.reranker.judge()?, query, &results, self.reranker.settings().listwise_snippet_chars).await
    }
}
