use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

pub const DEFAULT_MAX_LEN: usize = 256;

/// Files every local BERT-family model directory is expected to hold.
pub(crate) struct ModelFiles {
    pub tokenizer: Tokenizer,
    pub config_json: String,
    pub weights: HashMap<String, Tensor>,
    pub pad_id: u32,
}

pub(crate) fn load_model_files(model_dir: &Path, device: &Device) -> Result<ModelFiles> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;
    let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

    let config_path = model_dir.join("config.json");
    let config_json = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;

    let safetensors = model_dir.join("model.safetensors");
    let weights = if safetensors.is_file() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let bin = model_dir.join("pytorch_model.bin");
        warn!(path = %bin.display(), "no safetensors found, reading pickle weights");
        candle_core::pickle::read_all(&bin)?.into_iter().collect()
    };
    Ok(ModelFiles { tokenizer, config_json, weights, pad_id })
}

/// Sentence embedder on top of a BERT encoder (MiniLM-class models),
/// masked mean pooling followed by L2 normalization.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    pad_id: u32,
    dim: usize,
    max_len: usize,
    id: String,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");
        let files = load_model_files(model_dir, &device)?;
        let config: BertConfig = serde_json::from_str(&files.config_json)?;
        let dim = hidden_size(&files.config_json)?;
        let vb = VarBuilder::from_tensors(files.weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;

        let name = model_dir.file_name().and_then(|n| n.to_str()).unwrap_or("bert");
        let id = format!("bert:{name}:d{dim}");
        info!(%id, "embedding model ready");
        Ok(Self { model, tokenizer: files.tokenizer, device, pad_id: files.pad_id, dim, max_len: DEFAULT_MAX_LEN, id })
    }

    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let batch = tokenize_batch(&self.tokenizer, inputs, self.max_len, self.pad_id, &self.device)?;
        let hidden = self.model.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(rows)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn dim(&self) -> usize { self.dim }
}

#[derive(serde::Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

pub(crate) fn hidden_size(config_json: &str) -> Result<usize> {
    let HiddenSize { hidden_size } = serde_json::from_str(config_json).context("config.json lacks hidden_size")?;
    Ok(hidden_size)
}
