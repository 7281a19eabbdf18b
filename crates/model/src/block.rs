//! Encoder and decoder layers.
//!
//! Each layer is a fixed sequence of pre-norm residual connections. The
//! residual wrapper is handed a [`Sublayer`] describing what runs inside it,
//! so the wiring is written once in [`SublayerConnection::forward`].

use attention::MultiHeadAttention;
use candle_core::Tensor;
use layers::{ParamInit, PositionwiseFeedForward, SublayerConnection, TrainingMode};

use crate::{ModelConfig, Result};

/// The operation applied inside one residual connection.
#[derive(Debug, Clone, Copy)]
pub enum Sublayer<'a> {
    /// `attn(x, x, x, mask)`.
    SelfAttention {
        attn: &'a MultiHeadAttention,
        mask: Option<&'a Tensor>,
    },
    /// `attn(x, memory, memory, mask)`.
    CrossAttention {
        attn: &'a MultiHeadAttention,
        memory: &'a Tensor,
        mask: Option<&'a Tensor>,
    },
    FeedForward(&'a PositionwiseFeedForward),
}

impl Sublayer<'_> {
    /// Runs the sublayer on an already normalised input.
    pub fn apply(&self, normed: &Tensor) -> Result<Tensor> {
        match *self {
            Sublayer::SelfAttention { attn, mask } => {
                Ok(attn.forward(normed, normed, normed, mask)?.output)
            }
            Sublayer::CrossAttention { attn, memory, mask } => {
                Ok(attn.forward(normed, memory, memory, mask)?.output)
            }
            Sublayer::FeedForward(ff) => Ok(ff.forward(normed)?),
        }
    }
}

/// Self-attention followed by feed-forward, each behind a residual connection.
#[derive(Debug)]
pub struct EncoderLayer {
    self_attn: MultiHeadAttention,
    feed_forward: PositionwiseFeedForward,
    sublayers: [SublayerConnection; 2],
}

impl EncoderLayer {
    pub fn new(config: &ModelConfig, init: &mut ParamInit, mode: &TrainingMode) -> Result<Self> {
        let self_attn = MultiHeadAttention::new(config.attention_config(), init, mode)?;
        let feed_forward = PositionwiseFeedForward::new(config.feed_forward_config(), init, mode)?;
        let sublayers = [
            SublayerConnection::new(config.norm_config(), config.dropout, init, mode)?,
            SublayerConnection::new(config.norm_config(), config.dropout, init, mode)?,
        ];
        Ok(Self::from_parts(self_attn, feed_forward, sublayers))
    }

    pub fn from_parts(
        self_attn: MultiHeadAttention,
        feed_forward: PositionwiseFeedForward,
        sublayers: [SublayerConnection; 2],
    ) -> Self {
        Self {
            self_attn,
            feed_forward,
            sublayers,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.self_attn.parameter_count()
            + self.feed_forward.parameter_count()
            + self.sublayers.iter().map(SublayerConnection::parameter_count).sum::<usize>()
    }

    pub fn forward(&self, x: &Tensor, mask: Option<&Tensor>) -> Result<Tensor> {
        let attn = Sublayer::SelfAttention {
            attn: &self.self_attn,
            mask,
        };
        let x = self.sublayers[0].forward(x, |normed| attn.apply(normed))?;
        let ff = Sublayer::FeedForward(&self.feed_forward);
        self.sublayers[1].forward(&x, |normed| ff.apply(normed))
    }
}

/// Masked self-attention, cross-attention over the encoder memory, then
/// feed-forward.
#[derive(Debug)]
pub struct DecoderLayer {
    self_attn: MultiHeadAttention,
    src_attn: MultiHeadAttention,
    feed_forward: PositionwiseFeedForward,
    sublayers: [SublayerConnection; 3],
}

impl DecoderLayer {
    pub fn new(config: &ModelConfig, init: &mut ParamInit, mode: &TrainingMode) -> Result<Self> {
        let self_attn = MultiHeadAttention::new(config.attention_config(), init, mode)?;
        let src_attn = MultiHeadAttention::new(config.attention_config(), init, mode)?;
        let feed_forward = PositionwiseFeedForward::new(config.feed_forward_config(), init, mode)?;
        let sublayers = [
            SublayerConnection::new(config.norm_config(), config.dropout, init, mode)?,
            SublayerConnection::new(config.norm_config(), config.dropout, init, mode)?,
            SublayerConnection::new(config.norm_config(), config.dropout, init, mode)?,
        ];
        Ok(Self::from_parts(self_attn, src_attn, feed_forward, sublayers))
    }

    pub fn from_parts(
        self_attn: MultiHeadAttention,
        src_attn: MultiHeadAttention,
        feed_forward: PositionwiseFeedForward,
        sublayers: [SublayerConnection; 3],
    ) -> Self {
        Self {
            self_attn,
            src_attn,
            feed_forward,
            sublayers,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.self_attn.parameter_count()
            + self.src_attn.parameter_count()
            + self.feed_forward.parameter_count()
            + self.sublayers.iter().map(SublayerConnection::parameter_count).sum::<usize>()
    }

    /// `x` is the target so far, `memory` the encoder output.
    pub fn forward(
        &self,
        x: &Tensor,
        memory: &Tensor,
        src_mask: Option<&Tensor>,
        tgt_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let steps = [
            Sublayer::SelfAttention {
                attn: &self.self_attn,
                mask: tgt_mask,
            },
            Sublayer::CrossAttention {
                attn: &self.src_attn,
                memory,
                mask: src_mask,
            },
            Sublayer::FeedForward(&self.feed_forward),
        ];
        let mut hidden = x.clone();
        for (connection, sublayer) in self.sublayers.iter().zip(steps.iter()) {
            hidden = connection.forward(&hidden, |normed| sublayer.apply(normed))?;
        }
        Ok(hidden)
    }
}
