//! Error types emitted by attention implementations.

use layers::LayerError;
use thiserror::Error;

/// Attention-specific error category.
#[derive(Debug, Error)]
pub enum AttentionError {
    /// Construction parameters violate a structural invariant.
    #[error("invalid attention configuration: {0}")]
    InvalidConfig(String),
    /// The supplied tensor shapes do not align with the documented contract.
    #[error("invalid tensor shape for {context}: {detail}")]
    InvalidShape {
        context: &'static str,
        detail: String,
    },
    /// Failure raised by a projection, norm or dropout site.
    #[error(transparent)]
    Layer(#[from] LayerError),
    /// A backend-specific failure propagated to the caller.
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}

impl AttentionError {
    pub(crate) fn shape(context: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidShape {
            context,
            detail: detail.into(),
        }
    }
}
