use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};

/// Mean over unmasked token positions, then L2-normalized per row.
///
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]` with 1 for real tokens.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    ensure!(dims.len() == 3, "hidden shape must be [B,T,H], got {dims:?}");
    let (batch, hidden_dim) = (dims[0], dims[2]);

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let sum = (hidden * &mask_3d)?.sum(1)?;
    let lengths = mask.sum_keepdim(1)?.maximum(1.0)?;
    let mean = sum.broadcast_div(&lengths)?;
    let normalized = l2_rows(&mean)?;
    ensure!(normalized.dims() == [batch, hidden_dim], "pooled shape mismatch: {:?}", normalized.dims());
    Ok(normalized)
}

fn l2_rows(t: &Tensor) -> Result<Tensor> {
    let eps = match t.dtype() { DType::F16 => 1e-6, _ => 1e-12 };
    let norm = (t.sqr()?.sum_keepdim(1)?.sqrt()? + eps)?;
    Ok(t.broadcast_div(&norm)?)
}

/// In-place L2 normalization of a plain vector; an all-zero vector stays zero.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
