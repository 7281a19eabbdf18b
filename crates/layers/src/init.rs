//! Seeded parameter initialisation.
//!
//! Candle's CPU generator cannot be re-seeded, so parameters are sampled on
//! the host from a [`StdRng`] and uploaded to the target device. Every
//! constructor in the workspace takes `&mut ParamInit` and draws its own
//! values, which keeps stacked layers independent while making a whole model
//! reproducible from a single seed.

use candle_core::{DType, Device, Tensor};
use rand::{
    distributions::{Distribution, Uniform},
    rngs::StdRng,
    Rng, SeedableRng,
};

use crate::{LayerError, Result};

/// Source of freshly initialised parameter tensors.
#[derive(Debug)]
pub struct ParamInit {
    rng: StdRng,
    device: Device,
}

impl ParamInit {
    /// Creates an initialiser that places tensors on `device`.
    pub fn new(seed: u64, device: &Device) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            device: device.clone(),
        }
    }

    /// Device hosting the sampled parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Xavier/Glorot uniform matrix shaped `(rows, cols)`.
    ///
    /// Samples `U(-b, b)` with `b = sqrt(6 / (fan_in + fan_out))`, where
    /// `fan_in = cols` and `fan_out = rows`.
    pub fn xavier_uniform(&mut self, rows: usize, cols: usize) -> Result<Tensor> {
        if rows == 0 || cols == 0 {
            return Err(LayerError::InvalidConfig(format!(
                "xavier_uniform requires non-zero dimensions, got ({rows}, {cols})"
            )));
        }
        let bound = (6.0f64 / (rows + cols) as f64).sqrt() as f32;
        let dist = Uniform::new_inclusive(-bound, bound);
        let data: Vec<f32> = (0..rows * cols)
            .map(|_| dist.sample(&mut self.rng))
            .collect();
        Ok(Tensor::from_vec(data, (rows, cols), &self.device)?)
    }

    /// Vector sampled from `U(-bound, bound)`.
    ///
    /// Linear biases use `bound = 1 / sqrt(fan_in)`.
    pub fn uniform(&mut self, len: usize, bound: f32) -> Result<Tensor> {
        if len == 0 || !bound.is_finite() || bound <= 0.0 {
            return Err(LayerError::InvalidConfig(format!(
                "uniform requires a non-zero length and a positive finite bound, \
                 got ({len}, {bound})"
            )));
        }
        let dist = Uniform::new_inclusive(-bound, bound);
        let data: Vec<f32> = (0..len).map(|_| dist.sample(&mut self.rng)).collect();
        Ok(Tensor::from_vec(data, len, &self.device)?)
    }

    /// Vector of zeros.
    pub fn zeros(&self, len: usize) -> Result<Tensor> {
        Ok(Tensor::zeros(len, DType::F32, &self.device)?)
    }

    /// Vector of ones (normalisation gains).
    pub fn ones(&self, len: usize) -> Result<Tensor> {
        Ok(Tensor::ones(len, DType::F32, &self.device)?)
    }

    /// Draws a seed for a component-local generator such as dropout.
    pub fn fork_seed(&mut self) -> u64 {
        self.rng.gen()
    }
}
