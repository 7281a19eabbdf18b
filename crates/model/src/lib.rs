//! Encoder-decoder transformer assembled from the `layers`, `attention` and
//! `embedding` crates, with greedy decoding for inference.

pub mod block;
pub mod config;
pub mod decode;
pub mod error;
pub mod model;
pub mod stack;

pub use block::{DecoderLayer, EncoderLayer, Sublayer};
pub use config::{DecodeConfig, ModelConfig};
pub use decode::{greedy_decode, greedy_decode_with};
pub use error::{ModelError, Result};
pub use model::{EncoderDecoder, Generator};
pub use stack::{Decoder, Encoder};
