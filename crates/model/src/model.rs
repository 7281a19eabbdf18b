//! Top-level encoder-decoder assembly.

use candle_core::{Device, Tensor, D};
use candle_nn::ops::log_softmax;
use embedding::EmbeddingPipeline;
use layers::{Linear, LinearConfig, ParamInit, TrainingMode};

use crate::{
    stack::{Decoder, Encoder},
    ModelConfig, Result,
};

/// Projects hidden states to vocabulary log-probabilities.
#[derive(Debug)]
pub struct Generator {
    proj: Linear,
}

impl Generator {
    pub fn new(d_model: usize, vocab_size: usize, init: &mut ParamInit) -> Result<Self> {
        let proj = Linear::with_init(LinearConfig::new(d_model, vocab_size), init)?;
        Ok(Self { proj })
    }

    pub fn from_parts(proj: Linear) -> Self {
        Self { proj }
    }

    pub fn vocab_size(&self) -> usize {
        self.proj.config().output_dim
    }

    pub fn parameter_count(&self) -> usize {
        self.proj.parameter_count()
    }

    /// `log_softmax(proj(hidden))` over the last axis.
    ///
    /// Accepts a single `(d_model,)` vector or any `(.., d_model)` tensor;
    /// the output keeps the leading shape with `vocab_size` features.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        if hidden.rank() == 1 {
            let logits = self.proj.forward(&hidden.unsqueeze(0)?)?;
            return Ok(log_softmax(&logits, D::Minus1)?.squeeze(0)?);
        }
        let logits = self.proj.forward(hidden)?;
        Ok(log_softmax(&logits, D::Minus1)?)
    }
}

/// Encoder, decoder, both embedding pipelines and the generator.
///
/// Dropout sites share one training flag; a freshly built model is in
/// evaluation mode so inference is deterministic.
#[derive(Debug)]
pub struct EncoderDecoder {
    config: ModelConfig,
    encoder: Encoder,
    decoder: Decoder,
    src_embed: EmbeddingPipeline,
    tgt_embed: EmbeddingPipeline,
    generator: Generator,
    mode: TrainingMode,
}

impl EncoderDecoder {
    /// Validates `config` and initialises every parameter from `config.seed`.
    ///
    /// Fails with [`ModelError::InvalidConfig`](crate::ModelError::InvalidConfig)
    /// when `d_model` is not divisible by `n_heads`.
    pub fn new(config: &ModelConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let mode = TrainingMode::new(false);
        let mut init = ParamInit::new(config.seed, device);

        let encoder = Encoder::new(config, &mut init, &mode)?;
        let decoder = Decoder::new(config, &mut init, &mode)?;
        let src_embed = EmbeddingPipeline::new(
            config.src_vocab,
            config.d_model,
            config.max_len,
            config.dropout,
            &mut init,
            &mode,
        )?;
        let tgt_embed = EmbeddingPipeline::new(
            config.tgt_vocab,
            config.d_model,
            config.max_len,
            config.dropout,
            &mut init,
            &mode,
        )?;
        let generator = Generator::new(config.d_model, config.tgt_vocab, &mut init)?;

        let model = Self {
            config: config.clone(),
            encoder,
            decoder,
            src_embed,
            tgt_embed,
            generator,
            mode,
        };
        log::info!(
            "built encoder-decoder: layers={}, d_model={}, d_ff={}, heads={}, \
             vocab={}/{}, parameters={}",
            config.n_layers,
            config.d_model,
            config.d_ff,
            config.n_heads,
            config.src_vocab,
            config.tgt_vocab,
            model.parameter_count()
        );
        Ok(model)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        self.src_embed.device()
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn parameter_count(&self) -> usize {
        self.encoder.parameter_count()
            + self.decoder.parameter_count()
            + self.src_embed.parameter_count()
            + self.tgt_embed.parameter_count()
            + self.generator.parameter_count()
    }

    /// Switches every dropout site between training and evaluation.
    pub fn set_training(&self, training: bool) {
        self.mode.set_training(training);
    }

    pub fn is_training(&self) -> bool {
        self.mode.is_training()
    }

    /// Source ids `(batch, src_len)` to memory `(batch, src_len, d_model)`.
    pub fn encode(&self, src: &Tensor, src_mask: &Tensor) -> Result<Tensor> {
        let embedded = self.src_embed.forward(src)?;
        self.encoder.forward(&embedded, Some(src_mask))
    }

    /// Target ids so far `(batch, tgt_len)` to hidden states
    /// `(batch, tgt_len, d_model)`.
    pub fn decode(
        &self,
        memory: &Tensor,
        src_mask: &Tensor,
        tgt: &Tensor,
        tgt_mask: &Tensor,
    ) -> Result<Tensor> {
        let embedded = self.tgt_embed.forward(tgt)?;
        self.decoder
            .forward(&embedded, memory, Some(src_mask), Some(tgt_mask))
    }

    /// `decode(encode(src), tgt)`.
    pub fn forward(
        &self,
        src: &Tensor,
        tgt: &Tensor,
        src_mask: &Tensor,
        tgt_mask: &Tensor,
    ) -> Result<Tensor> {
        let memory = self.encode(src, src_mask)?;
        self.decode(&memory, src_mask, tgt, tgt_mask)
    }

    pub fn generate_logprobs(&self, hidden: &Tensor) -> Result<Tensor> {
        self.generator.forward(hidden)
    }
}
