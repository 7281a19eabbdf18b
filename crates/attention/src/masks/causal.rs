//! Builders for causal attention masks.

use candle_core::{Device, Tensor};

use crate::AttentionError;

/// Mask of shape `(1, size, size)` that is `1` on and below the diagonal.
///
/// Position `i` may attend to positions `0..=i` but never to later ones.
pub fn subsequent_mask(device: &Device, size: usize) -> Result<Tensor, AttentionError> {
    if size == 0 {
        return Err(AttentionError::shape(
            "subsequent_mask",
            "size must be non-zero",
        ));
    }
    let mut data = vec![0u8; size * size];
    for q in 0..size {
        for k in 0..=q {
            data[q * size + k] = 1;
        }
    }
    Ok(Tensor::from_vec(data, (1, size, size), device)?)
}
