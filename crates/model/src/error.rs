use attention::AttentionError;
use embedding::EmbeddingError;
use layers::LayerError;
use thiserror::Error;

/// Errors surfaced by model construction, inference and config loading.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Every violated configuration constraint, reported together.
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ConfigFormat(String),
    #[error("{context}: {detail}")]
    ShapeMismatch {
        context: &'static str,
        detail: String,
    },
    #[error(transparent)]
    Attention(#[from] AttentionError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
