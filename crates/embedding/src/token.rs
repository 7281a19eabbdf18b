//! Scaled token embedding lookup.

use candle_core::{DType, Tensor};
use layers::{checks, ParamInit};

use crate::{EmbeddingError, Result};

/// Vocabulary table of shape `(vocab_size, d_model)`.
///
/// Looked-up rows are multiplied by `sqrt(d_model)` so their magnitude is
/// comparable to the positional signal added afterwards.
#[derive(Debug, Clone)]
pub struct Embeddings {
    vocab_size: usize,
    d_model: usize,
    weight: Tensor,
}

impl Embeddings {
    /// Xavier-uniform table drawn from `init`.
    pub fn new(vocab_size: usize, d_model: usize, init: &mut ParamInit) -> Result<Self> {
        if vocab_size == 0 || d_model == 0 {
            return Err(EmbeddingError::InvalidConfig(format!(
                "vocab_size ({vocab_size}) and d_model ({d_model}) must be non-zero"
            )));
        }
        let weight = init.xavier_uniform(vocab_size, d_model)?;
        Self::from_weight(weight)
    }

    /// Wraps an existing `(vocab_size, d_model)` table.
    pub fn from_weight(weight: Tensor) -> Result<Self> {
        checks::expect_rank("embedding.weight", &weight, 2)?;
        let (vocab_size, d_model) = weight.dims2()?;
        Ok(Self {
            vocab_size,
            d_model,
            weight,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn parameter_count(&self) -> usize {
        self.weight.elem_count()
    }

    /// Maps `(batch, seq)` integer ids to `(batch, seq, d_model)` vectors.
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor> {
        let (batch, seq) = match token_ids.dims() {
            [batch, seq] if *batch > 0 && *seq > 0 => (*batch, *seq),
            dims => {
                return Err(EmbeddingError::ShapeMismatch {
                    context: "embedding.token_ids",
                    detail: format!("expected non-empty (batch, seq), got {dims:?}"),
                })
            }
        };
        if !token_ids.dtype().is_int() {
            return Err(EmbeddingError::ShapeMismatch {
                context: "embedding.token_ids",
                detail: format!("expected an integer dtype, got {:?}", token_ids.dtype()),
            });
        }

        let flat = token_ids.to_dtype(DType::I64)?.flatten_all()?;
        self.ensure_in_range(&flat)?;

        let gathered = self.weight.index_select(&flat, 0)?;
        let scale = (self.d_model as f64).sqrt();
        Ok(gathered
            .affine(scale, 0.0)?
            .reshape((batch, seq, self.d_model))?)
    }

    fn ensure_in_range(&self, flat_ids: &Tensor) -> Result<()> {
        let min_id = flat_ids.min_all()?.to_scalar::<i64>()?;
        if min_id < 0 {
            return Err(EmbeddingError::TokenOutOfRange {
                id: min_id,
                vocab_size: self.vocab_size,
            });
        }
        let max_id = flat_ids.max_all()?.to_scalar::<i64>()?;
        if max_id >= self.vocab_size as i64 {
            return Err(EmbeddingError::TokenOutOfRange {
                id: max_id,
                vocab_size: self.vocab_size,
            });
        }
        Ok(())
    }
}
