//! Position-wise feed-forward block.
//!
//! Operates on hidden states shaped `(batch, seq, d_model)`: expands to
//! `d_ff`, applies ReLU and dropout, then contracts back to `d_model`. Each
//! position is transformed independently.

use candle_core::Tensor;

use crate::{
    checks,
    dropout::{Dropout, TrainingMode},
    init::ParamInit,
    linear::{Linear, LinearConfig},
    LayerError, Result,
};

/// Configuration for [`PositionwiseFeedForward`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForwardConfig {
    /// Model hidden size.
    pub d_model: usize,
    /// Width of the inner activation space.
    pub d_ff: usize,
    /// Dropout applied after the activation.
    pub dropout_p: f32,
}

impl FeedForwardConfig {
    pub fn new(d_model: usize, d_ff: usize, dropout_p: f32) -> Self {
        Self {
            d_model,
            d_ff,
            dropout_p,
        }
    }
}

/// `w_2(dropout(relu(w_1(x))))`.
#[derive(Debug)]
pub struct PositionwiseFeedForward {
    config: FeedForwardConfig,
    w_1: Linear,
    w_2: Linear,
    dropout: Dropout,
}

impl PositionwiseFeedForward {
    pub fn new(
        config: FeedForwardConfig,
        init: &mut ParamInit,
        mode: &TrainingMode,
    ) -> Result<Self> {
        let w_1 = Linear::with_init(LinearConfig::new(config.d_model, config.d_ff), init)?;
        let w_2 = Linear::with_init(LinearConfig::new(config.d_ff, config.d_model), init)?;
        let dropout = Dropout::new(config.dropout_p, init.fork_seed(), mode)?;
        Ok(Self {
            config,
            w_1,
            w_2,
            dropout,
        })
    }

    /// Assembles the block from existing projections.
    pub fn from_parts(
        config: FeedForwardConfig,
        w_1: Linear,
        w_2: Linear,
        dropout: Dropout,
    ) -> Result<Self> {
        let inner = w_1.config();
        let outer = w_2.config();
        if inner.input_dim != config.d_model
            || inner.output_dim != config.d_ff
            || outer.input_dim != config.d_ff
            || outer.output_dim != config.d_model
        {
            return Err(LayerError::InvalidConfig(format!(
                "feed-forward projections must map {0} -> {1} -> {0}",
                config.d_model, config.d_ff
            )));
        }
        Ok(Self {
            config,
            w_1,
            w_2,
            dropout,
        })
    }

    pub fn config(&self) -> &FeedForwardConfig {
        &self.config
    }

    pub fn parameter_count(&self) -> usize {
        self.w_1.parameter_count() + self.w_2.parameter_count()
    }

    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        checks::expect_batch_seq_hidden("feed_forward.input", hidden, self.config.d_model)?;
        let activated = self.w_1.forward(hidden)?.relu()?;
        let dropped = self.dropout.forward(&activated)?;
        self.w_2.forward(&dropped)
    }
}
