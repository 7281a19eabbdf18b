//! Multi-head attention over `(batch, seq, d_model)` hidden states.

use candle_core::Tensor;
use layers::{checks, Dropout, Linear, LinearConfig, ParamInit, TrainingMode};

use crate::core::{AttentionError, AttentionOutput, Config};
use crate::reference::scaled_dot_product_attention;

/// Projects queries, keys and values into `n_heads` subspaces, attends in each
/// independently and merges the heads through an output projection.
#[derive(Debug)]
pub struct MultiHeadAttention {
    config: Config,
    head_dim: usize,
    w_q: Linear,
    w_k: Linear,
    w_v: Linear,
    w_o: Linear,
    dropout: Dropout,
}

impl MultiHeadAttention {
    /// Samples four `d_model x d_model` projections from `init`.
    ///
    /// Fails with [`AttentionError::InvalidConfig`] when `n_heads` does not
    /// divide `d_model`.
    pub fn new(
        config: Config,
        init: &mut ParamInit,
        mode: &TrainingMode,
    ) -> Result<Self, AttentionError> {
        let head_dim = config.head_dim()?;
        let square = LinearConfig::new(config.d_model, config.d_model);
        let w_q = Linear::with_init(square.clone(), init)?;
        let w_k = Linear::with_init(square.clone(), init)?;
        let w_v = Linear::with_init(square.clone(), init)?;
        let w_o = Linear::with_init(square, init)?;
        let dropout = Dropout::new(config.dropout_p, init.fork_seed(), mode)?;
        log::debug!(
            "multi-head attention: d_model={}, heads={}, d_k={}",
            config.d_model,
            config.n_heads,
            head_dim
        );
        Ok(Self {
            config,
            head_dim,
            w_q,
            w_k,
            w_v,
            w_o,
            dropout,
        })
    }

    /// Assembles the block from existing projections, in `[q, k, v, o]` order.
    pub fn from_parts(
        config: Config,
        projections: [Linear; 4],
        dropout: Dropout,
    ) -> Result<Self, AttentionError> {
        let head_dim = config.head_dim()?;
        for linear in &projections {
            let lc = linear.config();
            if lc.input_dim != config.d_model || lc.output_dim != config.d_model {
                return Err(AttentionError::InvalidConfig(format!(
                    "attention projections must be {0}x{0}, got {1}x{2}",
                    config.d_model, lc.output_dim, lc.input_dim
                )));
            }
        }
        let [w_q, w_k, w_v, w_o] = projections;
        Ok(Self {
            config,
            head_dim,
            w_q,
            w_k,
            w_v,
            w_o,
            dropout,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn head_dim(&self) -> usize {
        self.head_dim
    }

    pub fn parameter_count(&self) -> usize {
        [&self.w_q, &self.w_k, &self.w_v, &self.w_o]
            .iter()
            .map(|l| l.parameter_count())
            .sum()
    }

    /// Attends from `query` `(batch, q_len, d_model)` over `key`/`value`
    /// `(batch, k_len, d_model)`.
    ///
    /// `mask` is either `(q_len | 1, k_len)` or `(batch | 1, q_len | 1, k_len)`
    /// and is shared across heads. The returned weights are
    /// `(batch, n_heads, q_len, k_len)`.
    pub fn forward(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        mask: Option<&Tensor>,
    ) -> Result<AttentionOutput, AttentionError> {
        let d_model = self.config.d_model;
        let (batch, q_len) = checks::expect_batch_seq_hidden("attention.query", query, d_model)?;
        let (k_batch, k_len) = checks::expect_batch_seq_hidden("attention.key", key, d_model)?;
        let (v_batch, v_len) = checks::expect_batch_seq_hidden("attention.value", value, d_model)?;
        if k_batch != batch || v_batch != batch {
            return Err(AttentionError::shape(
                "attention.inputs",
                format!("batch sizes differ: query {batch}, key {k_batch}, value {v_batch}"),
            ));
        }
        if v_len != k_len {
            return Err(AttentionError::shape(
                "attention.value",
                format!("expected {k_len} positions to match key, got {v_len}"),
            ));
        }

        let mask = match mask {
            Some(mask) => Some(self.expand_mask(mask, batch, q_len, k_len)?),
            None => None,
        };

        let q = self.split_heads(&self.w_q.forward(query)?, batch, q_len)?;
        let k = self.split_heads(&self.w_k.forward(key)?, batch, k_len)?;
        let v = self.split_heads(&self.w_v.forward(value)?, batch, k_len)?;

        let attended =
            scaled_dot_product_attention(&q, &k, &v, mask.as_ref(), Some(&self.dropout))?;
        let merged = attended
            .output
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, q_len, d_model))?;
        let output = self.w_o.forward(&merged)?;

        Ok(AttentionOutput {
            output,
            weights: attended.weights,
        })
    }

    fn split_heads(&self, xs: &Tensor, batch: usize, seq: usize) -> Result<Tensor, AttentionError> {
        Ok(xs
            .reshape((batch, seq, self.config.n_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?)
    }

    /// Brings a rank-2 or rank-3 mask to `(batch | 1, 1, q_len | 1, k_len)`.
    fn expand_mask(
        &self,
        mask: &Tensor,
        batch: usize,
        q_len: usize,
        k_len: usize,
    ) -> Result<Tensor, AttentionError> {
        let mask = match mask.rank() {
            2 => mask.unsqueeze(0)?,
            3 => mask.clone(),
            _ => {
                return Err(AttentionError::shape(
                    "attention.mask",
                    format!("expected rank 2 or 3, got {:?}", mask.dims()),
                ))
            }
        };
        let (mb, mq, mk) = mask.dims3()?;
        if (mb != 1 && mb != batch) || (mq != 1 && mq != q_len) || mk != k_len {
            return Err(AttentionError::shape(
                "attention.mask",
                format!(
                    "mask {:?} incompatible with batch {batch}, q_len {q_len}, k_len {k_len}",
                    mask.dims()
                ),
            ));
        }
        Ok(mask.unsqueeze(1)?)
    }
}
