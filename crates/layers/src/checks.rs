//! Lightweight validation helpers shared across layer components.
//!
//! These routines provide concise shape assertions that can be wired into
//! constructors or forward paths. They return [`crate::Result`] so call sites
//! can propagate a [`LayerError::ShapeMismatch`] naming the boundary where the
//! mismatch was detected.

use candle_core::Tensor;

use crate::{LayerError, Result};

fn mismatch(context: &'static str, expected: String, tensor: &Tensor) -> LayerError {
    LayerError::ShapeMismatch {
        context,
        expected,
        actual: format!("{:?}", tensor.dims()),
    }
}

/// Ensures a tensor has exactly `rank` dimensions.
pub fn expect_rank(context: &'static str, tensor: &Tensor, rank: usize) -> Result<()> {
    if tensor.rank() == rank {
        Ok(())
    } else {
        Err(mismatch(context, format!("rank {rank}"), tensor))
    }
}

/// Ensures a tensor matches the expected dimensions exactly.
pub fn expect_shape(context: &'static str, tensor: &Tensor, expected: &[usize]) -> Result<()> {
    if tensor.dims() == expected {
        Ok(())
    } else {
        Err(mismatch(context, format!("{expected:?}"), tensor))
    }
}

/// Ensures the trailing (feature) dimension equals `dim`.
pub fn expect_last_dim(context: &'static str, tensor: &Tensor, dim: usize) -> Result<()> {
    match tensor.dims().last() {
        Some(&last) if last == dim => Ok(()),
        _ => Err(mismatch(context, format!("[.., {dim}]"), tensor)),
    }
}

/// Validates the `(batch, seq, hidden)` convention and returns `(batch, seq)`.
pub fn expect_batch_seq_hidden(
    context: &'static str,
    tensor: &Tensor,
    hidden: usize,
) -> Result<(usize, usize)> {
    match tensor.dims() {
        [batch, seq, actual] if *actual == hidden && *batch > 0 && *seq > 0 => Ok((*batch, *seq)),
        _ => Err(mismatch(context, format!("(batch, seq, {hidden})"), tensor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn batch_seq_hidden_reports_context() -> anyhow::Result<()> {
        let tensor = Tensor::zeros((2, 3, 5), DType::F32, &Device::Cpu)?;
        assert_eq!(expect_batch_seq_hidden("probe", &tensor, 5)?, (2, 3));

        let err = expect_batch_seq_hidden("probe", &tensor, 4).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("probe:"), "{message}");
        assert!(message.contains("[2, 3, 5]"), "{message}");
        Ok(())
    }

    #[test]
    fn rank_and_last_dim_checks() -> anyhow::Result<()> {
        let tensor = Tensor::zeros((4, 6), DType::F32, &Device::Cpu)?;
        expect_rank("probe", &tensor, 2)?;
        expect_last_dim("probe", &tensor, 6)?;
        expect_shape("probe", &tensor, &[4, 6])?;
        assert!(expect_rank("probe", &tensor, 3).is_err());
        assert!(expect_last_dim("probe", &tensor, 4).is_err());
        assert!(expect_shape("probe", &tensor, &[6, 4]).is_err());
        Ok(())
    }
}
