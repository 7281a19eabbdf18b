//! Pre-norm residual wrapper shared by every sublayer.
//!
//! `output = input + dropout(sublayer(LayerNorm(input)))`. The sublayer is any
//! closure mapping the normalised input to a tensor of the same shape, so the
//! same wrapper serves self-attention, cross-attention and feed-forward
//! branches.

use candle_core::Tensor;

use crate::{
    checks,
    dropout::{Dropout, TrainingMode},
    init::ParamInit,
    norm::{LayerNorm, NormConfig},
    LayerError,
};

/// Residual connection with its own normalisation and dropout.
#[derive(Debug)]
pub struct SublayerConnection {
    norm: LayerNorm,
    dropout: Dropout,
}

impl SublayerConnection {
    pub fn new(
        norm_config: NormConfig,
        dropout_p: f32,
        init: &mut ParamInit,
        mode: &TrainingMode,
    ) -> Result<Self, LayerError> {
        let norm = LayerNorm::with_init(norm_config, init)?;
        let dropout = Dropout::new(dropout_p, init.fork_seed(), mode)?;
        Ok(Self { norm, dropout })
    }

    pub fn from_parts(norm: LayerNorm, dropout: Dropout) -> Self {
        Self { norm, dropout }
    }

    pub fn norm(&self) -> &LayerNorm {
        &self.norm
    }

    pub fn parameter_count(&self) -> usize {
        self.norm.parameter_count()
    }

    /// Applies `sublayer` to the normalised input and adds the result back.
    pub fn forward<F, E>(&self, input: &Tensor, sublayer: F) -> Result<Tensor, E>
    where
        F: FnOnce(&Tensor) -> Result<Tensor, E>,
        E: From<LayerError>,
    {
        let normed = self.norm.forward(input)?;
        let branch = sublayer(&normed)?;
        checks::expect_shape("residual.branch", &branch, input.dims())?;
        let dropped = self.dropout.forward(&branch)?;
        Ok(input.add(&dropped).map_err(LayerError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn connection(dropout_p: f32, mode: &TrainingMode) -> Result<SublayerConnection, LayerError> {
        let mut init = ParamInit::new(0, &Device::Cpu);
        SublayerConnection::new(NormConfig::new(6), dropout_p, &mut init, mode)
    }

    #[test]
    fn identity_sublayer_adds_normalised_input() -> anyhow::Result<()> {
        let mode = TrainingMode::new(false);
        let residual = connection(0.1, &mode)?;
        let input = Tensor::randn(0f32, 1.0, (2, 3, 6), &Device::Cpu)?;

        let out = residual.forward(&input, |normed| Ok::<_, LayerError>(normed.clone()))?;
        let expected = input.add(&residual.norm().forward(&input)?)?;
        let diff = out.sub(&expected)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert_eq!(diff, 0.0);
        Ok(())
    }

    #[test]
    fn zero_branch_returns_input() -> anyhow::Result<()> {
        let mode = TrainingMode::new(true);
        let residual = connection(0.5, &mode)?;
        let input = Tensor::randn(0f32, 1.0, (1, 4, 6), &Device::Cpu)?;

        let out = residual.forward(&input, |normed| normed.zeros_like().map_err(LayerError::from))?;
        let diff = out.sub(&input)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert_eq!(diff, 0.0);
        Ok(())
    }

    #[test]
    fn branch_shape_mismatch_is_rejected() -> anyhow::Result<()> {
        let residual = connection(0.0, &TrainingMode::default())?;
        let input = Tensor::randn(0f32, 1.0, (1, 4, 6), &Device::Cpu)?;
        let err = residual
            .forward(&input, |normed| normed.narrow(1, 0, 2).map_err(LayerError::from))
            .unwrap_err();
        assert!(matches!(err, LayerError::ShapeMismatch { context: "residual.branch", .. }));
        Ok(())
    }
}
