//! Core types shared across the attention crate.

pub mod config;
pub mod errors;

use candle_core::Tensor;

pub use config::Config;
pub use errors::AttentionError;

/// Result of an attention call.
///
/// `weights` is returned for inspection only; nothing in the forward path
/// depends on it.
#[derive(Debug, Clone)]
pub struct AttentionOutput {
    /// Attended values, shaped like the query with the value feature size.
    pub output: Tensor,
    /// Post-softmax (and post-dropout) weights shaped `(.., q_len, k_len)`.
    pub weights: Tensor,
}
