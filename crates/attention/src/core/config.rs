//! Configuration for multi-head attention.

use super::AttentionError;

/// Structural and run-time knobs for [`MultiHeadAttention`](crate::MultiHeadAttention).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Model feature size carried in and out of the block.
    pub d_model: usize,
    /// Number of parallel heads; must divide `d_model`.
    pub n_heads: usize,
    /// Dropout probability applied to attention weights during training.
    pub dropout_p: f32,
}

impl Config {
    pub fn new(d_model: usize, n_heads: usize) -> Self {
        Self {
            d_model,
            n_heads,
            dropout_p: 0.0,
        }
    }

    pub fn with_dropout(mut self, dropout_p: f32) -> Self {
        self.dropout_p = dropout_p;
        self
    }

    /// Per-head feature size `d_model / n_heads`, validating the configuration.
    pub fn head_dim(&self) -> Result<usize, AttentionError> {
        if self.d_model == 0 || self.n_heads == 0 {
            return Err(AttentionError::InvalidConfig(format!(
                "d_model ({}) and n_heads ({}) must be non-zero",
                self.d_model, self.n_heads
            )));
        }
        if self.d_model % self.n_heads != 0 {
            return Err(AttentionError::InvalidConfig(format!(
                "d_model ({}) must be divisible by n_heads ({})",
                self.d_model, self.n_heads
            )));
        }
        if !(0.0..1.0).contains(&self.dropout_p) {
            return Err(AttentionError::InvalidConfig(format!(
                "dropout probability must be in [0, 1), got {}",
                self.dropout_p
            )));
        }
        Ok(self.d_model / self.n_heads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_dim_requires_divisibility() {
        assert_eq!(Config::new(512, 8).head_dim().unwrap(), 64);
        assert!(matches!(
            Config::new(10, 3).head_dim(),
            Err(AttentionError::InvalidConfig(_))
        ));
        assert!(Config::new(8, 0).head_dim().is_err());
        assert!(Config::new(8, 2).with_dropout(1.0).head_dim().is_err());
    }
}
