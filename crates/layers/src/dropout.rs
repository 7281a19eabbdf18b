//! Dropout with a model-wide training switch.
//!
//! Every dropout site holds a clone of one [`TrainingMode`] handle so a model
//! can flip all of them at once. Outside training mode, or with a zero
//! probability, dropout is the identity and the forward pass is fully
//! deterministic.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use candle_core::Tensor;

use crate::{LayerError, Result};

/// Shared training/evaluation flag.
#[derive(Debug, Clone, Default)]
pub struct TrainingMode(Arc<AtomicBool>);

impl TrainingMode {
    /// Creates a handle starting in the given mode.
    pub fn new(training: bool) -> Self {
        Self(Arc::new(AtomicBool::new(training)))
    }

    /// Enables or disables training behaviour for every site sharing this handle.
    pub fn set_training(&self, training: bool) {
        self.0.store(training, Ordering::Relaxed);
    }

    /// Returns `true` while dropout should be applied.
    pub fn is_training(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Inverted dropout: zeroes elements with probability `p` and rescales the
/// survivors by `1 / (1 - p)`.
#[derive(Debug)]
pub struct Dropout {
    probability: f32,
    mode: TrainingMode,
    rng: Mutex<Lcg64>,
}

impl Dropout {
    /// Builds a dropout site. `probability` must lie in `[0, 1)`.
    pub fn new(probability: f32, seed: u64, mode: &TrainingMode) -> Result<Self> {
        if !(0.0..1.0).contains(&probability) {
            return Err(LayerError::InvalidConfig(format!(
                "dropout probability must be in [0, 1), got {probability}"
            )));
        }
        Ok(Self {
            probability,
            mode: mode.clone(),
            rng: Mutex::new(Lcg64::new(seed)),
        })
    }

    /// A dropout site that never drops anything.
    pub fn disabled() -> Self {
        Self {
            probability: 0.0,
            mode: TrainingMode::default(),
            rng: Mutex::new(Lcg64::new(0)),
        }
    }

    pub fn probability(&self) -> f32 {
        self.probability
    }

    /// Whether the next call to [`Dropout::forward`] will modify its input.
    pub fn is_active(&self) -> bool {
        self.probability > 0.0 && self.mode.is_training()
    }

    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        if !self.is_active() {
            return Ok(xs.clone());
        }
        let keep_prob = 1.0 - self.probability;
        let total = xs.elem_count();
        let mask_data = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| LayerError::InvalidConfig("dropout RNG mutex poisoned".into()))?;
            (0..total)
                .map(|_| if rng.next_f32() < keep_prob { 1.0f32 } else { 0.0 })
                .collect::<Vec<_>>()
        };
        let mask = Tensor::from_vec(mask_data, xs.dims(), xs.device())?.to_dtype(xs.dtype())?;
        Ok(xs.mul(&mask)?.affine(1.0 / keep_prob as f64, 0.0)?)
    }
}

/// Simple 64-bit linear congruential generator for deterministic dropout masks.
#[derive(Debug, Clone)]
struct Lcg64 {
    state: u64,
}

impl Lcg64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // Knuth's MMIX multiplier.
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn next_f32(&mut self) -> f32 {
        const SCALE: f64 = 1.0 / ((1u64 << 53) as f64);
        let bits = self.next_u64() >> 11;
        (bits as f64 * SCALE) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn inactive_outside_training() -> anyhow::Result<()> {
        let mode = TrainingMode::new(false);
        let dropout = Dropout::new(0.5, 1, &mode)?;
        let input = Tensor::randn(0f32, 1.0, (2, 3, 4), &Device::Cpu)?;
        let out = dropout.forward(&input)?;
        let diff = input.sub(&out)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert_eq!(diff, 0.0);
        Ok(())
    }

    #[test]
    fn respects_probability_and_rescales() -> anyhow::Result<()> {
        let mode = TrainingMode::new(true);
        let dropout = Dropout::new(0.25, 123, &mode)?;
        let input = Tensor::ones((4, 8, 16), DType::F32, &Device::Cpu)?;
        let values = dropout.forward(&input)?.flatten_all()?.to_vec1::<f32>()?;

        let kept = 1.0 / 0.75;
        assert!(values
            .iter()
            .all(|v| *v == 0.0 || (*v - kept).abs() < 1e-6));
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        assert!((mean - 1.0).abs() < 0.1, "mean {mean}");
        Ok(())
    }

    #[test]
    fn shared_mode_toggles_every_site() -> anyhow::Result<()> {
        let mode = TrainingMode::new(true);
        let first = Dropout::new(0.3, 1, &mode)?;
        let second = Dropout::new(0.3, 2, &mode)?;
        assert!(first.is_active() && second.is_active());
        mode.set_training(false);
        assert!(!first.is_active() && !second.is_active());
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let mode = TrainingMode::default();
        assert!(Dropout::new(1.0, 0, &mode).is_err());
        assert!(Dropout::new(-0.1, 0, &mode).is_err());
        assert!(!Dropout::disabled().is_active());
    }
}
