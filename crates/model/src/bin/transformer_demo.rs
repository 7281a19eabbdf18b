use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use attention::padding_mask_from_lengths;
use candle_core::{Device, Tensor};
use clap::Parser;
use model::{greedy_decode_with, DecodeConfig, EncoderDecoder, ModelConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Greedy-decode a copy task with an untrained encoder-decoder",
    long_about = None
)]
struct Args {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Model config (.toml or .json); overrides the size flags"
    )]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 11)]
    src_vocab: usize,

    #[arg(long, default_value_t = 11)]
    tgt_vocab: usize,

    #[arg(long, default_value_t = 2, help = "Encoder and decoder depth")]
    layers: usize,

    #[arg(long, default_value_t = 9, help = "Tokens to generate after the start token")]
    steps: usize,

    #[arg(long, default_value_t = 0)]
    start_token: u32,

    #[arg(long, help = "Stop early once this token is produced")]
    end_token: Option<u32>,

    #[arg(long, help = "Initialisation seed (defaults to the config's)")]
    seed: Option<u64>,
}

const DEMO_LEN: u32 = 10;

/// The copy-task source `1..=10`; every id must exist in the vocabulary.
fn demo_source(src_vocab: usize) -> Result<Vec<u32>> {
    ensure!(
        src_vocab > DEMO_LEN as usize,
        "source vocabulary of {src_vocab} cannot hold token ids 1..={DEMO_LEN}; use at least {}",
        DEMO_LEN + 1
    );
    Ok((1..=DEMO_LEN).collect())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ModelConfig::from_path(path)
            .with_context(|| format!("loading model config from {}", path.display()))?,
        None => ModelConfig::new(args.src_vocab, args.tgt_vocab).with_layers(args.layers),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let source = demo_source(config.src_vocab)?;
    let device = Device::Cpu;
    let model = EncoderDecoder::new(&config, &device)?;

    let src = Tensor::from_slice(&source, (1, source.len()), &device)?;
    let src_mask = padding_mask_from_lengths(&device, &[source.len()], source.len())?;

    let mut decode = DecodeConfig::new(args.steps, args.start_token);
    if let Some(end) = args.end_token {
        decode = decode.with_end_token(end);
    }
    let prediction = greedy_decode_with(&model, &src, &src_mask, &decode)?;

    log::info!("decoded {} tokens", prediction.len());
    println!("source:     {source:?}");
    println!("prediction: {prediction:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_source_needs_eleven_symbols() -> Result<()> {
        assert_eq!(demo_source(11)?, (1..=10).collect::<Vec<u32>>());
        let err = demo_source(8).unwrap_err();
        assert!(err.to_string().contains("cannot hold token ids 1..=10"));
        Ok(())
    }
}
