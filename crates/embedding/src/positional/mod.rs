//! Positional signals added to token embeddings.

pub mod sinusoidal;

pub use sinusoidal::PositionalEncoding;
