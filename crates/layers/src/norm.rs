//! Layer normalisation with learned gain and bias.
//!
//! Each position's feature vector is normalised independently along the last
//! axis:
//!
//! ```text
//! y = gain * (x - mean) / (std + eps) + bias
//! ```
//!
//! `std` is the unbiased (Bessel-corrected) sample standard deviation and the
//! stabiliser is added to the standard deviation rather than the variance, so
//! the hidden size must be at least two.

use candle_core::{Tensor, D};

use crate::{checks, init::ParamInit, LayerError, Result};

/// Default stabiliser added to the standard deviation.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Configuration for [`LayerNorm`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormConfig {
    /// Size of the feature dimension being normalised.
    pub hidden_size: usize,
    /// Numeric stabiliser added to the standard deviation.
    pub epsilon: f64,
}

impl NormConfig {
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Per-position feature normalisation.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    config: NormConfig,
    weight: Tensor,
    bias: Tensor,
}

impl LayerNorm {
    /// Constructs a LayerNorm from explicit gain and bias vectors.
    pub fn new(weight: Tensor, bias: Tensor, config: NormConfig) -> Result<Self> {
        if config.hidden_size < 2 {
            return Err(LayerError::InvalidConfig(format!(
                "layer norm needs at least two features, got {}",
                config.hidden_size
            )));
        }
        if config.epsilon.is_nan() || config.epsilon <= 0.0 {
            return Err(LayerError::InvalidConfig(format!(
                "layer norm epsilon must be positive, got {}",
                config.epsilon
            )));
        }
        checks::expect_shape("norm.weight", &weight, &[config.hidden_size])?;
        checks::expect_shape("norm.bias", &bias, &[config.hidden_size])?;
        Ok(Self {
            config,
            weight,
            bias,
        })
    }

    /// Gain of one and bias of zero.
    pub fn with_init(config: NormConfig, init: &ParamInit) -> Result<Self> {
        let weight = init.ones(config.hidden_size)?;
        let bias = init.zeros(config.hidden_size)?;
        Self::new(weight, bias, config)
    }

    pub fn config(&self) -> &NormConfig {
        &self.config
    }

    pub fn parameter_count(&self) -> usize {
        self.weight.elem_count() + self.bias.elem_count()
    }

    /// Normalised features before the learned scale and shift.
    pub fn normalize(&self, hidden: &Tensor) -> Result<Tensor> {
        checks::expect_last_dim("norm.input", hidden, self.config.hidden_size)?;
        let features = self.config.hidden_size as f64;

        let mean = (hidden.sum_keepdim(D::Minus1)? / features)?;
        let centered = hidden.broadcast_sub(&mean)?;
        let variance = (centered.sqr()?.sum_keepdim(D::Minus1)? / (features - 1.0))?;
        let denom = (variance.sqrt()? + self.config.epsilon)?;
        Ok(centered.broadcast_div(&denom)?)
    }

    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        let normalized = self.normalize(hidden)?;
        Ok(normalized
            .broadcast_mul(&self.weight)?
            .broadcast_add(&self.bias)?)
    }
}
