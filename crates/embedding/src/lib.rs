//! Token embeddings and sinusoidal positional encoding.
//!
//! The [`EmbeddingPipeline`] turns `(batch, seq)` integer token ids into
//! `(batch, seq, d_model)` activations: a scaled table lookup followed by the
//! addition of a fixed positional signal and dropout.

pub mod pipeline;
pub mod positional;
pub mod token;

use layers::LayerError;
use thiserror::Error;

pub use pipeline::EmbeddingPipeline;
pub use positional::PositionalEncoding;
pub use token::Embeddings;

/// Errors raised by embedding components.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("invalid embedding configuration: {0}")]
    InvalidConfig(String),
    #[error("{context}: {detail}")]
    ShapeMismatch {
        context: &'static str,
        detail: String,
    },
    /// A token id fell outside `[0, vocab_size)`.
    #[error("token id {id} out of range for vocabulary of {vocab_size}")]
    TokenOutOfRange { id: i64, vocab_size: usize },
    /// The positional table is shorter than the requested sequence.
    #[error("sequence length {seq_len} exceeds positional table length {max_len}")]
    SequenceTooLong { seq_len: usize, max_len: usize },
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;
