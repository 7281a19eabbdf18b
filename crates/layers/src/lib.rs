//! Building blocks for encoder-decoder transformer layers.
//!
//! Every component here owns its parameters outright and operates on
//! `f32` tensors laid out as `(batch, seq, hidden)`. Parameters are drawn from
//! a seeded [`init::ParamInit`] so that two models constructed with the same
//! seed are bit-for-bit identical.

pub mod checks;
pub mod dropout;
pub mod init;
pub mod linear;
pub mod mlp;
pub mod norm;
pub mod residual;

use thiserror::Error;

pub use dropout::{Dropout, TrainingMode};
pub use init::ParamInit;
pub use linear::{Linear, LinearConfig};
pub use mlp::{FeedForwardConfig, PositionwiseFeedForward};
pub use norm::{LayerNorm, NormConfig};
pub use residual::SublayerConnection;

/// Errors raised while constructing or running layer components.
#[derive(Debug, Error)]
pub enum LayerError {
    /// A tensor did not match the layout expected at an operation boundary.
    #[error("{context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },
    /// Construction parameters violate a structural invariant.
    #[error("invalid layer configuration: {0}")]
    InvalidConfig(String),
    /// Failure propagated from the tensor backend.
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LayerError>;
