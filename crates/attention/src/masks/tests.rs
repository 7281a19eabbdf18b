use super::*;
use candle_core::Device;

#[test]
fn subsequent_mask_is_lower_triangular() -> anyhow::Result<()> {
    let mask = subsequent_mask(&Device::Cpu, 3)?;
    assert_eq!(mask.dims(), &[1, 3, 3]);
    assert_eq!(mask.dtype(), MASK_DTYPE);
    assert_eq!(
        mask.squeeze(0)?.to_vec2::<u8>()?,
        vec![vec![1, 0, 0], vec![1, 1, 0], vec![1, 1, 1]]
    );
    Ok(())
}

#[test]
fn subsequent_mask_single_token_and_empty() -> anyhow::Result<()> {
    let mask = subsequent_mask(&Device::Cpu, 1)?;
    assert_eq!(mask.flatten_all()?.to_vec1::<u8>()?, vec![1]);
    assert!(subsequent_mask(&Device::Cpu, 0).is_err());
    Ok(())
}

#[test]
fn padding_mask_from_lengths_masks_tail() -> anyhow::Result<()> {
    let mask = padding_mask_from_lengths(&Device::Cpu, &[2, 5], 5)?;
    assert_eq!(mask.dims(), &[2, 1, 5]);
    assert_eq!(
        mask.squeeze(1)?.to_vec2::<u8>()?,
        vec![vec![1, 1, 0, 0, 0], vec![1, 1, 1, 1, 1]]
    );
    Ok(())
}

#[test]
fn padding_mask_from_lengths_rejects_overlong_rows() {
    let err = padding_mask_from_lengths(&Device::Cpu, &[2, 7], 5).unwrap_err();
    assert!(matches!(
        err,
        AttentionError::InvalidShape { context: "padding_mask_from_lengths", .. }
    ));
    assert!(err.to_string().contains("row 1 has length 7"));
}

#[test]
fn padding_mask_from_booleans_respects_flags() -> anyhow::Result<()> {
    let rows = vec![vec![true, false, true], vec![true, true, false]];
    let mask = padding_mask_from_booleans(&Device::Cpu, &rows)?;
    assert_eq!(mask.dims(), &[2, 1, 3]);
    assert_eq!(
        mask.squeeze(1)?.to_vec2::<u8>()?,
        vec![vec![1, 0, 1], vec![1, 1, 0]]
    );

    let ragged = vec![vec![true, true], vec![true]];
    assert!(matches!(
        padding_mask_from_booleans(&Device::Cpu, &ragged),
        Err(AttentionError::InvalidShape { .. })
    ));
    Ok(())
}

#[test]
fn combined_mask_applies_both_constraints() -> anyhow::Result<()> {
    let device = Device::Cpu;
    let padding = padding_mask_from_lengths(&device, &[2], 3)?;
    let causal = subsequent_mask(&device, 3)?;
    let combined = combine_masks(&padding, &causal)?;
    assert_eq!(combined.dims(), &[1, 3, 3]);
    assert_eq!(
        combined.squeeze(0)?.to_vec2::<u8>()?,
        vec![vec![1, 0, 0], vec![1, 1, 0], vec![1, 1, 0]]
    );
    Ok(())
}

#[test]
fn normalize_mask_accepts_wider_dtypes() -> anyhow::Result<()> {
    let mask = candle_core::Tensor::from_vec(vec![0i64, 3, -1], 3, &Device::Cpu)?;
    let normalized = normalize_mask(&mask)?;
    assert_eq!(normalized.dtype(), MASK_DTYPE);
    assert_eq!(normalized.to_vec1::<u8>()?, vec![0, 1, 1]);
    Ok(())
}
