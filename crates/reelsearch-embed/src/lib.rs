//! reelsearch-embed
//!
//! Local embedding and cross-encoder models (candle BERT) plus deterministic
//! hashing fakes used in tests and offline runs.

use std::path::{Path, PathBuf};
use tracing::info;

use reelsearch_core::config::{expand_path, ModelSettings};
use reelsearch_core::traits::{CrossEncoder, Embedder};
use reelsearch_core::{Error, Result};

pub mod cross_encoder;
pub mod device;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use cross_encoder::{BertCrossEncoder, FakeCrossEncoder};
pub use model::BertEmbedder;
pub use pool::{l2_normalize, masked_mean_l2};

pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_CROSS_ENCODER_MODEL: &str = "ms-marco-MiniLM-L-6-v2";

pub(crate) fn embedding_err(e: anyhow::Error) -> Error {
    Error::Embedding(format!("{e:#}"))
}

impl Embedder for BertEmbedder {
    fn id(&self) -> &str { BertEmbedder::id(self) }
    fn dim(&self) -> usize { BertEmbedder::dim(self) }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts).map_err(embedding_err)
    }
}

/// Hashing embedder: each whitespace token lands in one bucket, then the
/// vector is L2-normalized. Same text, same vector.
#[derive(Debug, Clone)]
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("fake:xxhash64:d{dim}") }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for FakeEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fake_requested(models: &ModelSettings) -> bool {
    models.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

pub fn get_default_embedder(models: &ModelSettings) -> Result<Box<dyn Embedder>> {
    if fake_requested(models) {
        info!(dim = models.fake_dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(models.fake_dim)));
    }
    let dir = resolve_model_dir(models.embedding_dir.as_deref(), DEFAULT_EMBEDDING_MODEL)?;
    Ok(Box::new(BertEmbedder::load(&dir).map_err(embedding_err)?))
}

pub fn get_default_cross_encoder(models: &ModelSettings) -> Result<Box<dyn CrossEncoder>> {
    if fake_requested(models) {
        info!("using FakeCrossEncoder");
        return Ok(Box::new(FakeCrossEncoder));
    }
    let dir = resolve_model_dir(models.cross_encoder_dir.as_deref(), DEFAULT_CROSS_ENCODER_MODEL)?;
    Ok(Box::new(BertCrossEncoder::load(&dir).map_err(embedding_err)?))
}

/// Configured directory first, then `APP_MODEL_DIR/<name>`, then `models/<name>`
/// relative to the working directory or its parent.
fn resolve_model_dir(configured: Option<&str>, name: &str) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = configured {
        candidates.push(expand_path(dir));
    }
    if let Ok(root) = std::env::var("APP_MODEL_DIR") {
        candidates.push(expand_path(root).join(name));
    }
    candidates.push(Path::new("models").join(name));
    candidates.push(Path::new("../models").join(name));

    for dir in &candidates {
        if dir.is_dir() {
            info!(dir = %dir.display(), "using model dir");
            return Ok(dir.clone());
        }
    }
    Err(Error::NotFound(format!(
        "model directory for {name} not found (tried {})",
        candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    )))
}
