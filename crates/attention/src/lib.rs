//! Scaled dot-product and multi-head attention for encoder-decoder models.
//!
//! Inputs to [`MultiHeadAttention`] are laid out `(batch, seq, d_model)`. The
//! projections split `d_model` into `n_heads` heads of `d_k = d_model / n_heads`
//! features, which are processed in one batched call to
//! [`scaled_dot_product_attention`] with layout `(batch, heads, seq, d_k)`.
//!
//! Masks are `u8` tensors where non-zero means "may attend". Masked scores are
//! replaced by a large negative constant rather than `-inf`, so a query row with
//! every key masked degrades to a uniform distribution instead of producing
//! NaNs.
//!
//! Dropout on the attention weights is a train-only concern; outside training
//! mode the computation is deterministic.

pub mod core;
pub mod masks;
pub mod multi_head;
pub mod reference;

pub use core::{AttentionError, AttentionOutput, Config};
pub use masks::{
    combine_masks, padding_mask_from_booleans, padding_mask_from_lengths, subsequent_mask,
};
pub use multi_head::MultiHeadAttention;
pub use reference::{scaled_dot_product_attention, MASK_FILL_VALUE};
