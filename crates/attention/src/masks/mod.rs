//! Mask utilities shared by attention implementations.
//!
//! All masks produced here are `u8` tensors: `1` where attention is permitted
//! and `0` where it is forbidden. Padding masks are shaped `(batch, 1, k_len)`
//! and causal masks `(1, size, size)`; both broadcast against the
//! `(query, key)` axes of an attention score tensor.

pub mod causal;
pub mod padding;

use candle_core::{DType, Tensor};

use crate::AttentionError;

/// Dtype shared by all boolean masks.
pub const MASK_DTYPE: DType = DType::U8;

pub use causal::subsequent_mask;
pub use padding::{combine_masks, padding_mask_from_booleans, padding_mask_from_lengths};

/// Converts any numeric mask into the canonical `u8` 0/1 encoding.
pub fn normalize_mask(mask: &Tensor) -> Result<Tensor, AttentionError> {
    if mask.dtype() == MASK_DTYPE {
        return Ok(mask.ne(0u8)?);
    }
    Ok(mask.to_dtype(DType::F32)?.ne(0f32)?)
}

#[cfg(test)]
mod tests;
