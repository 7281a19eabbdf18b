//! Fixed sinusoidal positional encoding.
//!
//! For position `pos` and feature pair `i`:
//!
//! ```text
//! PE[pos, 2i]     = sin(pos / 10000^(2i / d_model))
//! PE[pos, 2i + 1] = cos(pos / 10000^(2i / d_model))
//! ```
//!
//! The table is computed once at construction and is not a parameter.

use candle_core::{Device, Tensor};
use layers::{checks, Dropout};

use crate::{EmbeddingError, Result};

const BASE: f64 = 10_000.0;

/// Precomputed `(max_len, d_model)` table plus the dropout applied after the
/// addition.
#[derive(Debug)]
pub struct PositionalEncoding {
    d_model: usize,
    max_len: usize,
    table: Tensor,
    dropout: Dropout,
}

impl PositionalEncoding {
    pub fn new(d_model: usize, max_len: usize, dropout: Dropout, device: &Device) -> Result<Self> {
        if d_model == 0 || max_len == 0 {
            return Err(EmbeddingError::InvalidConfig(format!(
                "d_model ({d_model}) and max_len ({max_len}) must be non-zero"
            )));
        }
        let table = Tensor::from_vec(sinusoid_table(d_model, max_len), (max_len, d_model), device)?;
        log::debug!("positional table: max_len={max_len}, d_model={d_model}");
        Ok(Self {
            d_model,
            max_len,
            table,
            dropout,
        })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn table(&self) -> &Tensor {
        &self.table
    }

    /// Adds the first `seq` rows of the table to `(batch, seq, d_model)`
    /// embeddings, then applies dropout.
    pub fn forward(&self, embeddings: &Tensor) -> Result<Tensor> {
        let (_, seq_len) =
            checks::expect_batch_seq_hidden("positional.input", embeddings, self.d_model)?;
        if seq_len > self.max_len {
            return Err(EmbeddingError::SequenceTooLong {
                seq_len,
                max_len: self.max_len,
            });
        }
        let signal = self.table.narrow(0, 0, seq_len)?.unsqueeze(0)?;
        let summed = embeddings.broadcast_add(&signal)?;
        Ok(self.dropout.forward(&summed)?)
    }
}

fn sinusoid_table(d_model: usize, max_len: usize) -> Vec<f32> {
    let log_base = BASE.ln() / d_model as f64;
    let div_terms: Vec<f64> = (0..d_model)
        .map(|feature| (-((feature - feature % 2) as f64) * log_base).exp())
        .collect();

    let mut data = Vec::with_capacity(max_len * d_model);
    for pos in 0..max_len {
        for (feature, div) in div_terms.iter().enumerate() {
            let angle = pos as f64 * div;
            let value = if feature % 2 == 0 { angle.sin() } else { angle.cos() };
            data.push(value as f32);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use layers::TrainingMode;

    fn encoding(d_model: usize, max_len: usize) -> Result<PositionalEncoding> {
        PositionalEncoding::new(d_model, max_len, Dropout::disabled(), &Device::Cpu)
    }

    #[test]
    fn table_follows_sinusoid_formula() -> anyhow::Result<()> {
        let pe = encoding(8, 16)?;
        let table = pe.table().to_vec2::<f32>()?;

        assert_eq!(table[0], vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        assert!((table[1][0] - 1f32.sin()).abs() < 1e-6);
        assert!((table[1][1] - 1f32.cos()).abs() < 1e-6);

        let freq = 1.0 / 10_000f64.powf(2.0 / 8.0);
        assert!((table[5][2] as f64 - (5.0 * freq).sin()).abs() < 1e-6);
        assert!((table[5][3] as f64 - (5.0 * freq).cos()).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn adds_leading_rows_to_input() -> anyhow::Result<()> {
        let pe = encoding(4, 10)?;
        let zeros = Tensor::zeros((2, 3, 4), DType::F32, &Device::Cpu)?;
        let out = pe.forward(&zeros)?;
        let expected = pe.table().narrow(0, 0, 3)?;
        for b in 0..2 {
            let diff = out.get(b)?.sub(&expected)?.abs()?.max_all()?.to_vec0::<f32>()?;
            assert_eq!(diff, 0.0);
        }
        Ok(())
    }

    #[test]
    fn sequence_past_max_len_fails() -> anyhow::Result<()> {
        let pe = encoding(4, 3)?;
        let input = Tensor::zeros((1, 4, 4), DType::F32, &Device::Cpu)?;
        assert!(matches!(
            pe.forward(&input),
            Err(EmbeddingError::SequenceTooLong { seq_len: 4, max_len: 3 })
        ));
        Ok(())
    }

    #[test]
    fn odd_feature_count_is_supported() -> anyhow::Result<()> {
        let pe = encoding(5, 4)?;
        assert_eq!(pe.table().dims(), &[4, 5]);
        Ok(())
    }

    #[test]
    fn dropout_follows_training_mode() -> anyhow::Result<()> {
        let mode = TrainingMode::new(true);
        let pe = PositionalEncoding::new(4, 8, Dropout::new(0.5, 3, &mode)?, &Device::Cpu)?;
        let input = Tensor::ones((1, 8, 4), DType::F32, &Device::Cpu)?;
        let trained = pe.forward(&input)?.flatten_all()?.to_vec1::<f32>()?;
        assert!(trained.iter().any(|v| *v == 0.0));

        mode.set_training(false);
        let eval = pe.forward(&input)?;
        let expected = input.broadcast_add(&pe.table().unsqueeze(0)?)?;
        assert_eq!(eval.sub(&expected)?.abs()?.max_all()?.to_vec0::<f32>()?, 0.0);
        Ok(())
    }
}
