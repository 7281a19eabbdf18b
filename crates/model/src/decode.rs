//! Greedy autoregressive decoding.

use attention::subsequent_mask;
use candle_core::{Tensor, D};

use crate::{DecodeConfig, EncoderDecoder, ModelError, Result};

/// Decodes exactly `max_steps` tokens after `start_token`.
///
/// Returns a `u32` tensor shaped `(1, 1 + max_steps)` whose first element is
/// the start token.
pub fn greedy_decode(
    model: &EncoderDecoder,
    src: &Tensor,
    src_mask: &Tensor,
    max_steps: usize,
    start_token: u32,
) -> Result<Tensor> {
    let config = DecodeConfig::new(max_steps, start_token);
    let tokens = greedy_decode_with(model, src, src_mask, &config)?;
    let len = tokens.len();
    Ok(Tensor::from_vec(tokens, (1, len), model.device())?)
}

/// Greedy decoding driven by a [`DecodeConfig`].
///
/// The source must hold a single sequence. The memory is computed once; each
/// step re-runs the decoder over the whole prefix under a causal mask and
/// appends the arg-max of the last position's log-probabilities. With an
/// `end_token` configured, decoding stops after that token is emitted.
pub fn greedy_decode_with(
    model: &EncoderDecoder,
    src: &Tensor,
    src_mask: &Tensor,
    config: &DecodeConfig,
) -> Result<Vec<u32>> {
    match src.dims() {
        [1, _] => {}
        dims => {
            return Err(ModelError::ShapeMismatch {
                context: "greedy_decode.src",
                detail: format!("expected a single sequence (1, src_len), got {dims:?}"),
            })
        }
    }

    let device = model.device();
    let memory = model.encode(src, src_mask)?;
    let mut tokens = Vec::with_capacity(config.max_steps + 1);
    tokens.push(config.start_token);

    for step in 0..config.max_steps {
        let len = tokens.len();
        let tgt = Tensor::from_slice(&tokens, (1, len), device)?;
        let tgt_mask = subsequent_mask(device, len)?;
        let hidden = model.decode(&memory, src_mask, &tgt, &tgt_mask)?;

        let last = hidden.narrow(1, len - 1, 1)?.squeeze(1)?;
        let logprobs = model.generate_logprobs(&last)?;
        let next = logprobs.argmax(D::Minus1)?.squeeze(0)?.to_scalar::<u32>()?;
        log::debug!("greedy step {step}: token {next}");
        tokens.push(next);

        if config.end_token == Some(next) {
            log::debug!("end token {next} reached after {} steps", step + 1);
            break;
        }
    }
    Ok(tokens)
}
