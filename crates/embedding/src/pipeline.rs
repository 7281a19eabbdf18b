//! Token lookup followed by positional encoding.

use candle_core::{Device, Tensor};
use layers::{Dropout, ParamInit, TrainingMode};

use crate::{Embeddings, PositionalEncoding, Result};

/// `positional(embeddings(ids))`, the input stage of each side of the model.
#[derive(Debug)]
pub struct EmbeddingPipeline {
    embeddings: Embeddings,
    positional: PositionalEncoding,
}

impl EmbeddingPipeline {
    pub fn new(
        vocab_size: usize,
        d_model: usize,
        max_len: usize,
        dropout_p: f32,
        init: &mut ParamInit,
        mode: &TrainingMode,
    ) -> Result<Self> {
        let embeddings = Embeddings::new(vocab_size, d_model, init)?;
        let dropout = Dropout::new(dropout_p, init.fork_seed(), mode)?;
        let device = init.device().clone();
        let positional = PositionalEncoding::new(d_model, max_len, dropout, &device)?;
        Ok(Self {
            embeddings,
            positional,
        })
    }

    pub fn from_parts(embeddings: Embeddings, positional: PositionalEncoding) -> Self {
        Self {
            embeddings,
            positional,
        }
    }

    pub fn embeddings(&self) -> &Embeddings {
        &self.embeddings
    }

    pub fn positional(&self) -> &PositionalEncoding {
        &self.positional
    }

    pub fn device(&self) -> &Device {
        self.embeddings.weight().device()
    }

    pub fn parameter_count(&self) -> usize {
        self.embeddings.parameter_count()
    }

    /// `(batch, seq)` token ids to `(batch, seq, d_model)` activations.
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor> {
        let embedded = self.embeddings.forward(token_ids)?;
        self.positional.forward(&embedded)
    }
}
