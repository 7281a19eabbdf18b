//! Builders for padding masks used to drop padded keys.

use candle_core::{Device, Tensor};

use super::normalize_mask;
use crate::AttentionError;

/// Padding mask `(batch, 1, max_len)` from per-sequence valid lengths.
///
/// A length longer than `max_len` is an error.
pub fn padding_mask_from_lengths(
    device: &Device,
    lengths: &[usize],
    max_len: usize,
) -> Result<Tensor, AttentionError> {
    if lengths.is_empty() || max_len == 0 {
        return Err(AttentionError::shape(
            "padding_mask_from_lengths",
            format!(
                "need a non-empty batch and max_len > 0, got {} rows and max_len {max_len}",
                lengths.len()
            ),
        ));
    }
    if let Some((idx, &valid)) = lengths.iter().enumerate().find(|(_, &len)| len > max_len) {
        return Err(AttentionError::shape(
            "padding_mask_from_lengths",
            format!("row {idx} has length {valid}, longer than max_len {max_len}"),
        ));
    }
    let mut data = vec![0u8; lengths.len() * max_len];
    for (b, &valid) in lengths.iter().enumerate() {
        data[b * max_len..b * max_len + valid].fill(1);
    }
    Ok(Tensor::from_vec(data, (lengths.len(), 1, max_len), device)?)
}

/// Padding mask `(batch, 1, k_len)` from per-token flags.
///
/// `true` marks a real token and `false` a padded position. Every row must
/// share the same length.
pub fn padding_mask_from_booleans(
    device: &Device,
    rows: &[Vec<bool>],
) -> Result<Tensor, AttentionError> {
    let k_len = rows.first().map(Vec::len).unwrap_or(0);
    if k_len == 0 {
        return Err(AttentionError::shape(
            "padding_mask_from_booleans",
            "need at least one non-empty row",
        ));
    }
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != k_len) {
        return Err(AttentionError::shape(
            "padding_mask_from_booleans",
            format!("row {idx} has length {} but row 0 has {k_len}", row.len()),
        ));
    }
    let data: Vec<u8> = rows
        .iter()
        .flat_map(|row| row.iter().map(|&real| u8::from(real)))
        .collect();
    Ok(Tensor::from_vec(data, (rows.len(), 1, k_len), device)?)
}

/// Element-wise AND of a padding mask and a causal mask.
///
/// `padding` is `(batch, 1, k_len)` and `causal` is `(1, q_len, k_len)`; the
/// result is `(batch, q_len, k_len)`.
pub fn combine_masks(padding: &Tensor, causal: &Tensor) -> Result<Tensor, AttentionError> {
    let (pb, pq, pk) = padding
        .dims3()
        .map_err(|_| {
            AttentionError::shape("combine_masks.padding", format!("{:?}", padding.dims()))
        })?;
    let (cb, cq, ck) = causal
        .dims3()
        .map_err(|_| {
            AttentionError::shape("combine_masks.causal", format!("{:?}", causal.dims()))
        })?;
    if pq != 1 || cb != 1 || pk != ck {
        return Err(AttentionError::shape(
            "combine_masks",
            format!(
                "expected (batch, 1, k) and (1, q, k), \
                 got [{pb}, {pq}, {pk}] and [{cb}, {cq}, {ck}]"
            ),
        ));
    }
    let padding = normalize_mask(padding)?;
    let causal = normalize_mask(causal)?;
    Ok(padding.broadcast_mul(&causal)?)
}
