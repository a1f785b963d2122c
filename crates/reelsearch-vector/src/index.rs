use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{info, warn};

use reelsearch_core::cache::{ArtifactStore, CollectionFingerprint};
use reelsearch_core::config::VectorSettings;
use reelsearch_core::data_processor::{ChunkingConfig, DataProcessor};
use reelsearch_core::traits::Embedder;
use reelsearch_core::types::Document;
use reelsearch_core::{Error, Result};

use crate::artifact::{ChunkRef, EmbeddingArtifact, EMBEDDINGS_ARTIFACT};

/// Chunk vectors of a whole collection, searched by brute-force cosine.
pub struct VectorIndex {
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) artifact: EmbeddingArtifact,
}

fn processor(settings: &VectorSettings) -> DataProcessor {
    DataProcessor::with_chunking(ChunkingConfig {
        max_words: settings.chunk_words,
        overlap_words: settings.chunk_overlap,
    })
}

impl VectorIndex {
    /// Embed every chunk of `documents` in batches of `settings.batch_size`.
    pub fn build(embedder: Arc<dyn Embedder>, settings: &VectorSettings, documents: &[Document]) -> Result<Self> {
        let chunks = processor(settings).chunk_collection(documents);
        info!(documents = documents.len(), chunks = chunks.len(), embedder = embedder.id(), "embedding collection");

        let pb = ProgressBar::new(chunks.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let dim = embedder.dim();
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(settings.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = embedder.embed_batch(&texts)?;
            if embedded.len() != texts.len() {
                return Err(Error::Embedding(format!("asked for {} vectors, got {}", texts.len(), embedded.len())));
            }
            if let Some(v) = embedded.iter().find(|v| v.len() != dim) {
                return Err(Error::Embedding(format!("embedder returned d{} vector, expected d{dim}", v.len())));
            }
            vectors.extend(embedded);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        let artifact = EmbeddingArtifact {
            fingerprint: CollectionFingerprint::of(documents),
            embedder_id: embedder.id().to_string(),
            dim,
            built_at: Utc::now(),
            chunks: chunks.iter().map(|c| ChunkRef { doc_id: c.doc_id, chunk_index: c.chunk_index }).collect(),
            vectors,
        };
        info!(vectors = artifact.vectors.len(), dim, "vector index built");
        Ok(Self { embedder, artifact })
    }

    pub fn save(&self, store: &ArtifactStore) -> Result<()> {
        store.write_json(EMBEDDINGS_ARTIFACT, &self.artifact)?;
        info!(dir = %store.dir().display(), vectors = self.artifact.vectors.len(), "saved embeddings");
        Ok(())
    }

    /// Load cached vectors; `StaleCache` if they were built from another
    /// collection or model, `IndexNotReady` if there is no artifact.
    pub fn load(
        embedder: Arc<dyn Embedder>,
        settings: &VectorSettings,
        store: &ArtifactStore,
        documents: &[Document],
    ) -> Result<Self> {
        let artifact: EmbeddingArtifact = store
            .read_json(EMBEDDINGS_ARTIFACT)?
            .ok_or_else(|| Error::IndexNotReady(format!("no embeddings under {}", store.dir().display())))?;
        let expected = processor(settings).chunk_collection(documents).len();
        let fingerprint = CollectionFingerprint::of(documents);
        if let Some(reason) = artifact.staleness(&fingerprint, expected, embedder.id(), embedder.dim()) {
            return Err(Error::StaleCache(reason));
        }
        Ok(Self { embedder, artifact })
    }

    pub fn load_or_build(
        embedder: Arc<dyn Embedder>,
        settings: &VectorSettings,
        store: &ArtifactStore,
        documents: &[Document],
    ) -> Result<Self> {
        match Self::load(Arc::clone(&embedder), settings, store, documents) {
            Ok(index) => {
                info!(vectors = index.len(), "loaded embeddings from cache");
                return Ok(index);
            }
            Err(Error::IndexNotReady(_)) => info!("no embedding cache, building"),
            Err(Error::StaleCache(reason)) => warn!(%reason, "embedding cache is stale, rebuilding"),
            Err(e) => return Err(e),
        }
        let index = Self::build(embedder, settings, documents)?;
        index.save(store)?;
        Ok(index)
    }

    /// Number of stored vectors (chunks, not documents).
    pub fn len(&self) -> usize {
        self.artifact.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifact.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.artifact.dim
    }

    pub fn artifact(&self) -> &EmbeddingArtifact {
        &self.artifact
    }
}
