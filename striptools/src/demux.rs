//! Reordering of interleaved ADC samples into physical channel order
//!
//! The boards read their ADC lanes round-robin: raw sample `j` belongs to
//! channel `j / lanes` of lane `order[j % lanes]`, where adjacent lanes are
//! pair-swapped. The physical order lays the lanes out one after the other.

use crate::error::DemuxError;
use crate::Variant;

/// Physical index of raw sample `j`
#[inline(always)]
pub fn destination(j: usize, variant: Variant) -> usize {
    let order = variant.lane_order();
    order[j % order.len()] * variant.lane_channels() + j / order.len()
}

fn check_len(len: usize, variant: Variant) -> Result<(), DemuxError> {
    let expected = variant.block_len();
    if len != expected {
        return Err(DemuxError::Length {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Put raw interleaved samples in ascending physical channel order.
///
/// This is a permutation: every output index is written exactly once.
pub fn demux<T: Copy + Default>(raw: &[T], variant: Variant) -> Result<Vec<T>, DemuxError> {
    check_len(raw.len(), variant)?;
    let mut ordered = vec![T::default(); raw.len()];
    for (j, &s) in raw.iter().enumerate() {
        ordered[destination(j, variant)] = s;
    }
    Ok(ordered)
}

/// Inverse of [`demux`]: restore the order in which the board sends samples
pub fn remux<T: Copy + Default>(ordered: &[T], variant: Variant) -> Result<Vec<T>, DemuxError> {
    check_len(ordered.len(), variant)?;
    let raw = (0..ordered.len())
        .map(|j| ordered[destination(j, variant)])
        .collect();
    Ok(raw)
}

/// Split a board block at its midpoint into the two sensor sides
pub fn split_sides<T>(mut ordered: Vec<T>) -> [Vec<T>; 2] {
    let b = ordered.split_off(ordered.len() / 2);
    [ordered, b]
}
