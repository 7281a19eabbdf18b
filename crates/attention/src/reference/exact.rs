//! `softmax(Q K^T / sqrt(d_k)) V` with optional masking and dropout.

use candle_core::Tensor;
use candle_nn::ops::softmax_last_dim;
use layers::Dropout;

use crate::core::{AttentionError, AttentionOutput};
use crate::masks::normalize_mask;

/// Score written into masked positions before the softmax.
///
/// Finite so that a fully masked row yields a uniform distribution rather
/// than NaNs.
pub const MASK_FILL_VALUE: f32 = -1e9;

/// Computes attention over the last two axes.
///
/// * `query` is `(.., q_len, d_k)`, `key` is `(.., k_len, d_k)` and `value` is
///   `(.., k_len, d_v)`; leading axes must match exactly (heads are just
///   another leading axis).
/// * `mask`, when present, must broadcast to `(.., q_len, k_len)`: every
///   dimension either equals the score dimension or is `1`. Zero entries are
///   forbidden positions.
/// * `dropout`, when present and active, is applied to the weights.
///
/// Returns the attended values `(.., q_len, d_v)` together with the weights.
pub fn scaled_dot_product_attention(
    query: &Tensor,
    key: &Tensor,
    value: &Tensor,
    mask: Option<&Tensor>,
    dropout: Option<&Dropout>,
) -> Result<AttentionOutput, AttentionError> {
    let rank = query.rank();
    if rank < 2 || key.rank() != rank || value.rank() != rank {
        return Err(AttentionError::shape(
            "attention.inputs",
            format!(
                "q, k, v must share a rank >= 2, got {:?}, {:?}, {:?}",
                query.dims(),
                key.dims(),
                value.dims()
            ),
        ));
    }

    let (q_dims, k_dims, v_dims) = (query.dims(), key.dims(), value.dims());
    let lead = rank - 2;
    let d_k = q_dims[rank - 1];
    let k_len = k_dims[rank - 2];
    if k_dims[..lead] != q_dims[..lead] || v_dims[..lead] != q_dims[..lead] {
        return Err(AttentionError::shape(
            "attention.inputs",
            format!(
                "leading dims differ: q {:?}, k {:?}, v {:?}",
                q_dims, k_dims, v_dims
            ),
        ));
    }
    if k_dims[rank - 1] != d_k {
        return Err(AttentionError::shape(
            "attention.key",
            format!("expected feature size {d_k}, got {:?}", k_dims),
        ));
    }
    if v_dims[rank - 2] != k_len {
        return Err(AttentionError::shape(
            "attention.value",
            format!("expected {k_len} positions to match key, got {:?}", v_dims),
        ));
    }
    if d_k == 0 {
        return Err(AttentionError::shape("attention.query", "d_k must be non-zero"));
    }

    let key_t = key.transpose(rank - 2, rank - 1)?.contiguous()?;
    let scores = query.contiguous()?.matmul(&key_t)?;
    let mut scores = (scores / (d_k as f64).sqrt())?;

    if let Some(mask) = mask {
        scores = apply_mask(&scores, mask)?;
    }

    let weights = softmax_last_dim(&scores.contiguous()?)?;
    let weights = match dropout {
        Some(dropout) => dropout.forward(&weights)?,
        None => weights,
    };
    let output = weights.matmul(&value.contiguous()?)?;

    Ok(AttentionOutput { output, weights })
}

fn apply_mask(scores: &Tensor, mask: &Tensor) -> Result<Tensor, AttentionError> {
    let dims = scores.dims();
    if mask.rank() > dims.len() {
        return Err(AttentionError::shape(
            "attention.mask",
            format!("mask {:?} has higher rank than scores {:?}", mask.dims(), dims),
        ));
    }

    let mut aligned = vec![1usize; dims.len() - mask.rank()];
    aligned.extend_from_slice(mask.dims());
    let broadcastable = aligned
        .iter()
        .zip(dims.iter())
        .all(|(&m, &s)| m == 1 || m == s);
    if !broadcastable {
        return Err(AttentionError::shape(
            "attention.mask",
            format!("mask {:?} does not broadcast to scores {:?}", mask.dims(), dims),
        ));
    }

    let keep = normalize_mask(&mask.reshape(aligned)?)?
        .broadcast_as(dims)?
        .contiguous()?;
    let fill = Tensor::full(MASK_FILL_VALUE, dims, scores.device())?.to_dtype(scores.dtype())?;
    Ok(keep.where_cond(scores, &fill)?)
}
