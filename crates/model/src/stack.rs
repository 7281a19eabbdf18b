//! Encoder and decoder stacks: `N` independently initialised layers and a
//! final LayerNorm.

use candle_core::Tensor;
use layers::{LayerNorm, ParamInit, TrainingMode};

use crate::{
    block::{DecoderLayer, EncoderLayer},
    ModelConfig, ModelError, Result,
};

fn ensure_non_empty(len: usize, what: &str) -> Result<()> {
    if len == 0 {
        return Err(ModelError::InvalidConfig(vec![format!(
            "{what} needs at least one layer"
        )]));
    }
    Ok(())
}

#[derive(Debug)]
pub struct Encoder {
    layers: Vec<EncoderLayer>,
    norm: LayerNorm,
}

impl Encoder {
    /// Builds `config.n_layers` layers, each drawing fresh parameters.
    pub fn new(config: &ModelConfig, init: &mut ParamInit, mode: &TrainingMode) -> Result<Self> {
        let layers = (0..config.n_layers)
            .map(|_| EncoderLayer::new(config, init, mode))
            .collect::<Result<Vec<_>>>()?;
        let norm = LayerNorm::with_init(config.norm_config(), init)?;
        Self::from_parts(layers, norm)
    }

    pub fn from_parts(layers: Vec<EncoderLayer>, norm: LayerNorm) -> Result<Self> {
        ensure_non_empty(layers.len(), "encoder")?;
        Ok(Self { layers, norm })
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn parameter_count(&self) -> usize {
        let layers: usize = self.layers.iter().map(EncoderLayer::parameter_count).sum();
        layers + self.norm.parameter_count()
    }

    pub fn forward(&self, x: &Tensor, mask: Option<&Tensor>) -> Result<Tensor> {
        let mut hidden = x.clone();
        for layer in &self.layers {
            hidden = layer.forward(&hidden, mask)?;
        }
        Ok(self.norm.forward(&hidden)?)
    }
}

#[derive(Debug)]
pub struct Decoder {
    layers: Vec<DecoderLayer>,
    norm: LayerNorm,
}

impl Decoder {
    pub fn new(config: &ModelConfig, init: &mut ParamInit, mode: &TrainingMode) -> Result<Self> {
        let layers = (0..config.n_layers)
            .map(|_| DecoderLayer::new(config, init, mode))
            .collect::<Result<Vec<_>>>()?;
        let norm = LayerNorm::with_init(config.norm_config(), init)?;
        Self::from_parts(layers, norm)
    }

    pub fn from_parts(layers: Vec<DecoderLayer>, norm: LayerNorm) -> Result<Self> {
        ensure_non_empty(layers.len(), "decoder")?;
        Ok(Self { layers, norm })
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn parameter_count(&self) -> usize {
        let layers: usize = self.layers.iter().map(DecoderLayer::parameter_count).sum();
        layers + self.norm.parameter_count()
    }

    /// Threads `memory` and both masks through every layer unchanged.
    pub fn forward(
        &self,
        x: &Tensor,
        memory: &Tensor,
        src_mask: Option<&Tensor>,
        tgt_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let mut hidden = x.clone();
        for layer in &self.layers {
            hidden = layer.forward(&hidden, memory, src_mask, tgt_mask)?;
        }
        Ok(self.norm.forward(&hidden)?)
    }
}
