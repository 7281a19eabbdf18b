//! Model hyperparameters and decode settings.

use std::{fs, path::Path};

use attention::Config as AttentionConfig;
use layers::{norm::DEFAULT_EPSILON, FeedForwardConfig, NormConfig};
use serde::{Deserialize, Serialize};

use crate::{ModelError, Result};

fn default_n_layers() -> usize {
    6
}

fn default_d_model() -> usize {
    512
}

fn default_d_ff() -> usize {
    2048
}

fn default_n_heads() -> usize {
    8
}

fn default_dropout() -> f32 {
    0.1
}

fn default_max_len() -> usize {
    5000
}

fn default_eps() -> f64 {
    DEFAULT_EPSILON
}

/// Shape and initialisation of an [`EncoderDecoder`](crate::EncoderDecoder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub src_vocab: usize,
    pub tgt_vocab: usize,
    /// Depth of both the encoder and the decoder stack.
    #[serde(default = "default_n_layers")]
    pub n_layers: usize,
    #[serde(default = "default_d_model")]
    pub d_model: usize,
    #[serde(default = "default_d_ff")]
    pub d_ff: usize,
    #[serde(default = "default_n_heads")]
    pub n_heads: usize,
    /// Shared by every dropout site; only applied in training mode.
    #[serde(default = "default_dropout")]
    pub dropout: f32,
    /// Longest sequence the positional table covers.
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    /// Seed for parameter initialisation and dropout generators.
    #[serde(default)]
    pub seed: u64,
    /// LayerNorm stabiliser.
    #[serde(default = "default_eps")]
    pub eps: f64,
}

impl ModelConfig {
    /// Reference hyperparameters for the given vocabulary sizes.
    pub fn new(src_vocab: usize, tgt_vocab: usize) -> Self {
        Self {
            src_vocab,
            tgt_vocab,
            n_layers: default_n_layers(),
            d_model: default_d_model(),
            d_ff: default_d_ff(),
            n_heads: default_n_heads(),
            dropout: default_dropout(),
            max_len: default_max_len(),
            seed: 0,
            eps: default_eps(),
        }
    }

    pub fn with_layers(mut self, n_layers: usize) -> Self {
        self.n_layers = n_layers;
        self
    }

    pub fn with_dims(mut self, d_model: usize, d_ff: usize, n_heads: usize) -> Self {
        self.d_model = d_model;
        self.d_ff = d_ff;
        self.n_heads = n_heads;
        self
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Loads a config from `.toml` (also the fallback for extensionless
    /// paths) or `.json`, then validates it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: ModelConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .map_err(|err| ModelError::ConfigFormat(err.to_string()))?,
            Some("toml") | None => {
                toml::from_str(&contents).map_err(|err| ModelError::ConfigFormat(err.to_string()))?
            }
            Some(other) => {
                return Err(ModelError::ConfigFormat(format!(
                    "unsupported configuration extension '{other}'"
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.src_vocab == 0 {
            errors.push("src_vocab must be greater than 0".to_string());
        }
        if self.tgt_vocab == 0 {
            errors.push("tgt_vocab must be greater than 0".to_string());
        }
        if self.n_layers == 0 {
            errors.push("n_layers must be greater than 0".to_string());
        }
        if self.d_model < 2 {
            errors.push(format!("d_model must be at least 2, got {}", self.d_model));
        }
        if self.d_ff == 0 {
            errors.push("d_ff must be greater than 0".to_string());
        }
        if self.n_heads == 0 {
            errors.push("n_heads must be greater than 0".to_string());
        } else if self.d_model % self.n_heads != 0 {
            errors.push(format!(
                "d_model ({}) must be divisible by n_heads ({})",
                self.d_model, self.n_heads
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            errors.push(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        if self.max_len == 0 {
            errors.push("max_len must be greater than 0".to_string());
        }
        if self.eps.is_nan() || self.eps <= 0.0 {
            errors.push(format!("eps must be positive, got {}", self.eps));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ModelError::InvalidConfig(errors))
        }
    }

    pub fn attention_config(&self) -> AttentionConfig {
        AttentionConfig::new(self.d_model, self.n_heads).with_dropout(self.dropout)
    }

    pub fn feed_forward_config(&self) -> FeedForwardConfig {
        FeedForwardConfig::new(self.d_model, self.d_ff, self.dropout)
    }

    pub fn norm_config(&self) -> NormConfig {
        NormConfig::new(self.d_model).with_epsilon(self.eps)
    }
}

/// Settings for [`greedy_decode_with`](crate::greedy_decode_with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Number of tokens to generate after the start token.
    pub max_steps: usize,
    pub start_token: u32,
    /// Stop as soon as this token is produced. `None` always runs
    /// `max_steps` steps.
    pub end_token: Option<u32>,
}

impl DecodeConfig {
    pub fn new(max_steps: usize, start_token: u32) -> Self {
        Self {
            max_steps,
            start_token,
            end_token: None,
        }
    }

    pub fn with_end_token(mut self, end_token: u32) -> Self {
        self.end_token = Some(end_token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_defaults() {
        let config = ModelConfig::new(11, 13);
        assert_eq!(config.n_layers, 6);
        assert_eq!(config.d_model, 512);
        assert_eq!(config.d_ff, 2048);
        assert_eq!(config.n_heads, 8);
        assert_eq!(config.dropout, 0.1);
        assert_eq!(config.eps, 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_collects_every_violation() {
        let config = ModelConfig::new(0, 11)
            .with_dims(10, 0, 3)
            .with_dropout(1.5)
            .with_max_len(0);
        match config.validate() {
            Err(ModelError::InvalidConfig(errors)) => {
                assert_eq!(errors.len(), 5, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("divisible by n_heads")));
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_take_defaults() -> anyhow::Result<()> {
        let config: ModelConfig = toml::from_str("src_vocab = 11\ntgt_vocab = 11\nn_layers = 2\n")?;
        assert_eq!(config, ModelConfig::new(11, 11).with_layers(2));

        let config: ModelConfig =
            serde_json::from_str(r#"{"src_vocab": 5, "tgt_vocab": 7, "seed": 3}"#)?;
        assert_eq!(config.seed, 3);
        assert_eq!(config.max_len, 5000);
        Ok(())
    }

    static_assertions::assert_impl_all!(ModelConfig: Serialize, serde::de::DeserializeOwned);
    static_assertions::assert_not_impl_any!(DecodeConfig: Serialize);

    #[test]
    fn decode_config_end_token_is_opt_in() {
        let config = DecodeConfig::new(9, 0);
        assert_eq!(config.end_token, None);
        assert_eq!(config.with_end_token(2).end_token, Some(2));
    }
}
