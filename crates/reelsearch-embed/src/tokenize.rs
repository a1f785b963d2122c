use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Encoding, Tokenizer};

/// Model inputs for one batch, each `[B, T]` with `T` the longest encoding (capped).
pub struct BatchInputs {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

pub fn tokenize_batch<'s, E>(tokenizer: &Tokenizer, inputs: Vec<E>, max_len: usize, pad_id: u32, device: &Device) -> Result<BatchInputs>
where
    E: Into<EncodeInput<'s>> + Send,
{
    let encodings = tokenizer
        .encode_batch(inputs, true)
        .map_err(|e| anyhow!("tokenization failed: {e}"))?;
    pad_encodings(&encodings, max_len, pad_id, device)
}

fn pad_encodings(encodings: &[Encoding], max_len: usize, pad_id: u32, device: &Device) -> Result<BatchInputs> {
    let seq_len = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let batch = encodings.len();
    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut type_ids = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);
    for enc in encodings {
        let take = enc.get_ids().len().min(seq_len);
        ids.extend_from_slice(&enc.get_ids()[..take]);
        type_ids.extend_from_slice(&enc.get_type_ids()[..take]);
        mask.extend_from_slice(&enc.get_attention_mask()[..take]);
        let pad = seq_len - take;
        ids.extend(std::iter::repeat(pad_id).take(pad));
        type_ids.extend(std::iter::repeat(0).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }
    Ok(BatchInputs {
        input_ids: Tensor::from_vec(ids, (batch, seq_len), device)?,
        token_type_ids: Tensor::from_vec(type_ids, (batch, seq_len), device)?,
        attention_mask: Tensor::from_vec(mask, (batch, seq_len), device)?,
    })
}
