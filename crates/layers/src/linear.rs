//! Dense affine projections.
//!
//! Linear layers accept any input whose trailing dimension equals
//! `config.input_dim` (typically `(batch, seq, in_dim)` or `(rows, in_dim)`)
//! and return a tensor with the same leading dimensions and `output_dim`
//! features. Weights are stored `(output_dim, input_dim)` and initialised with
//! Xavier-uniform; biases are drawn from `U(-1/sqrt(in), 1/sqrt(in))`.

use candle_core::Tensor;

use crate::{checks, init::ParamInit, LayerError, Result};

/// Configuration shared by dense projection layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConfig {
    /// Incoming feature dimension.
    pub input_dim: usize,
    /// Output feature dimension.
    pub output_dim: usize,
    /// Whether a learnable bias vector should be applied.
    pub bias: bool,
}

impl LinearConfig {
    /// Creates a configuration for a biased projection.
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            bias: true,
        }
    }
}

/// Dense affine projection `y = x W^T + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    config: LinearConfig,
    weight: Tensor,
    bias: Option<Tensor>,
}

impl Linear {
    /// Constructs a linear layer from pre-existing parameters.
    pub fn new(config: LinearConfig, weight: Tensor, bias: Option<Tensor>) -> Result<Self> {
        checks::expect_shape("linear.weight", &weight, &[config.output_dim, config.input_dim])?;
        match (config.bias, bias.as_ref()) {
            (true, Some(tensor)) => {
                checks::expect_shape("linear.bias", tensor, &[config.output_dim])?
            }
            (false, None) => {}
            (false, Some(_)) => {
                return Err(LayerError::InvalidConfig(
                    "bias provided but config disables bias".into(),
                ))
            }
            (true, None) => {
                return Err(LayerError::InvalidConfig(
                    "config expects bias but none supplied".into(),
                ))
            }
        }
        Ok(Self {
            config,
            weight,
            bias,
        })
    }

    /// Builds a linear layer with Xavier-uniform weights and a fan-in scaled
    /// uniform bias.
    pub fn with_init(config: LinearConfig, init: &mut ParamInit) -> Result<Self> {
        let weight = init.xavier_uniform(config.output_dim, config.input_dim)?;
        let bias = if config.bias {
            let bound = 1.0 / (config.input_dim as f32).sqrt();
            Some(init.uniform(config.output_dim, bound)?)
        } else {
            None
        };
        Self::new(config, weight, bias)
    }

    pub fn config(&self) -> &LinearConfig {
        &self.config
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    /// Number of scalar parameters owned by the layer.
    pub fn parameter_count(&self) -> usize {
        self.weight.elem_count() + self.bias.as_ref().map_or(0, Tensor::elem_count)
    }

    /// Applies the projection along the trailing dimension.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        if hidden.rank() < 2 {
            return Err(LayerError::ShapeMismatch {
                context: "linear.input",
                expected: format!("[.., {}] with rank >= 2", self.config.input_dim),
                actual: format!("{:?}", hidden.dims()),
            });
        }
        checks::expect_last_dim("linear.input", hidden, self.config.input_dim)?;

        let dims = hidden.dims();
        let rows = dims[..dims.len() - 1].iter().product::<usize>();
        let flat = hidden.reshape((rows, self.config.input_dim))?;
        let mut output = flat.matmul(&self.weight.t()?)?;
        if let Some(bias) = &self.bias {
            output = output.broadcast_add(bias)?;
        }

        let mut out_dims = dims[..dims.len() - 1].to_vec();
        out_dims.push(self.config.output_dim);
        Ok(output.reshape(out_dims)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    fn reference_linear(
        input: &Tensor,
        weight: &Tensor,
        bias: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let (batch, seq, hidden) = input.dims3()?;
        input
            .reshape((batch * seq, hidden))?
            .matmul(&weight.t()?)?
            .broadcast_add(bias)?
            .reshape((batch, seq, weight.dims()[0]))
    }

    #[test]
    fn forward_matches_reference() -> anyhow::Result<()> {
        let device = Device::Cpu;
        let config = LinearConfig::new(8, 4);
        let weight = Tensor::randn(0f32, 0.05, (4, 8), &device)?;
        let bias = Tensor::randn(0f32, 0.02, 4, &device)?;
        let linear = Linear::new(config, weight.clone(), Some(bias.clone()))?;

        let input = Tensor::randn(0f32, 1.0, (2, 5, 8), &device)?;
        let output = linear.forward(&input)?;
        assert_eq!(output.dims(), &[2, 5, 4]);

        let reference = reference_linear(&input, &weight, &bias)?;
        let diff = output.sub(&reference)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert!(diff <= 1e-5, "max diff {diff}");
        Ok(())
    }

    #[test]
    fn forward_accepts_two_dimensional_rows() -> anyhow::Result<()> {
        let mut init = ParamInit::new(0, &Device::Cpu);
        let linear = Linear::with_init(LinearConfig::new(6, 3), &mut init)?;
        let input = Tensor::ones((4, 6), DType::F32, &Device::Cpu)?;
        assert_eq!(linear.forward(&input)?.dims(), &[4, 3]);
        Ok(())
    }

    #[test]
    fn bias_is_drawn_within_fan_in_bound() -> anyhow::Result<()> {
        let mut init = ParamInit::new(2, &Device::Cpu);
        let linear = Linear::with_init(LinearConfig::new(16, 64), &mut init)?;
        let bound = 1.0 / 4.0;
        let bias = linear.bias().expect("bias").to_vec1::<f32>()?;
        assert_eq!(bias.len(), 64);
        assert!(bias.iter().all(|b| b.abs() <= bound));
        assert!(bias.iter().any(|b| *b != 0.0));
        Ok(())
    }

    #[test]
    fn rejects_mismatched_feature_dim() -> anyhow::Result<()> {
        let mut init = ParamInit::new(0, &Device::Cpu);
        let linear = Linear::with_init(LinearConfig::new(6, 3), &mut init)?;
        let input = Tensor::ones((1, 2, 5), DType::F32, &Device::Cpu)?;
        let err = linear.forward(&input).unwrap_err();
        assert!(matches!(err, LayerError::ShapeMismatch { context: "linear.input", .. }));
        Ok(())
    }

    #[test]
    fn bias_configuration_is_validated() -> anyhow::Result<()> {
        let device = Device::Cpu;
        let weight = Tensor::zeros((2, 2), DType::F32, &device)?;
        let mut config = LinearConfig::new(2, 2);
        assert!(Linear::new(config.clone(), weight.clone(), None).is_err());
        config.bias = false;
        let bias = Tensor::zeros(2, DType::F32, &device)?;
        assert!(Linear::new(config.clone(), weight.clone(), Some(bias)).is_err());
        let linear = Linear::new(config, weight, None)?;
        assert_eq!(linear.parameter_count(), 4);
        Ok(())
    }
}
