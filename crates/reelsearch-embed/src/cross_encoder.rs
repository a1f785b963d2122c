use anyhow::Result;
use candle_core::{DType, Device, Module};
use candle_nn::{linear, Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::BTreeSet;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use reelsearch_core::traits::CrossEncoder;

use crate::device::select_device;
use crate::embedding_err;
use crate::model::{hidden_size, load_model_files, DEFAULT_MAX_LEN};
use crate::tokenize::tokenize_batch;

/// BERT sequence classifier with a single relevance logit
/// (ms-marco MiniLM style checkpoints).
pub struct BertCrossEncoder {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    pad_id: u32,
    max_len: usize,
}

impl BertCrossEncoder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading cross-encoder");
        let files = load_model_files(model_dir, &device)?;
        let config: BertConfig = serde_json::from_str(&files.config_json)?;
        let hidden = hidden_size(&files.config_json)?;
        let vb = VarBuilder::from_tensors(files.weights, DType::F32, &device);

        let bert = BertModel::load(vb.clone(), &config)?;
        let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = linear(hidden, 1, vb.pp("classifier"))?;
        Ok(Self { bert, pooler, classifier, tokenizer: files.tokenizer, device, pad_id: files.pad_id, max_len: DEFAULT_MAX_LEN })
    }

    fn logits(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        let inputs: Vec<(&str, &str)> = pairs.iter().map(|(q, d)| (q.as_str(), d.as_str())).collect();
        let batch = tokenize_batch(&self.tokenizer, inputs, self.max_len, self.pad_id, &self.device)?;
        let hidden = self.bert.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?.squeeze(1)?;
        let scores = logits.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.to_vec1()?;
        debug!(pairs = pairs.len(), "scored pairs");
        Ok(scores)
    }
}

impl CrossEncoder for BertCrossEncoder {
    fn score_pairs(&self, pairs: &[(String, String)]) -> reelsearch_core::Result<Vec<f32>> {
        self.logits(pairs).map_err(embedding_err)
    }
}

/// Deterministic stand-in: fraction of query words found in the candidate text.
#[derive(Debug, Default, Clone)]
pub struct FakeCrossEncoder;

impl FakeCrossEncoder {
    fn words(text: &str) -> BTreeSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

impl CrossEncoder for FakeCrossEncoder {
    fn score_pairs(&self, pairs: &[(String, String)]) -> reelsearch_core::Result<Vec<f32>> {
        Ok(pairs
            .iter()
            .map(|(query, text)| {
                let q = Self::words(query);
                if q.is_empty() {
                    return 0.0;
                }
                let t = Self::words(text);
                q.intersection(&t).count() as f32 / q.len() as f32
            })
            .collect())
    }
}
