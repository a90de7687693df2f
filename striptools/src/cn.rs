//! Common-mode noise estimation per VA chip
//!
//! All channels read by one VA share a baseline that drifts from event to
//! event. The drift is estimated from the channels themselves and removed
//! group by group.

use crate::calib::{CalibrationTable, ChannelCalibration, Status};
use crate::error::ConfigError;
use crate::{ADC_CEILING, SENTINEL, VA_CHANNELS};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Estimator used for the common-mode offset, selected by a numeric tag
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Algorithm {
    /// Plain mean of the usable channels
    Mean = 0,
    /// Mean of the central half of the usable channels
    TrimmedMean = 1,
    /// Mean after iteratively dropping channels beyond 2.5 rms
    ClippedMean = 2,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::Mean,
        Algorithm::TrimmedMean,
        Algorithm::ClippedMean,
    ];
}

impl TryFrom<u8> for Algorithm {
    type Error = ConfigError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Algorithm::Mean),
            1 => Ok(Algorithm::TrimmedMean),
            2 => Ok(Algorithm::ClippedMean),
            t => Err(ConfigError::UnknownAlgorithm(t)),
        }
    }
}

impl From<Algorithm> for u8 {
    fn from(a: Algorithm) -> u8 {
        a as u8
    }
}

/// Common-mode offset of one group
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Estimate {
    pub value: f32,
    pub valid: bool,
}

impl Estimate {
    pub const INVALID: Estimate = Estimate {
        value: SENTINEL,
        valid: false,
    };

    fn of(value: f32) -> Estimate {
        Estimate { value, valid: true }
    }

    /// Whether the offset may be subtracted, given the largest believable one
    pub fn usable(&self, max_common_noise: f32) -> bool {
        self.valid && self.value.abs() < max_common_noise
    }
}

/// Estimate the common-mode offset of group `group` of `signal`.
///
/// Groups that do not fit in the signal or the calibration are invalid.
pub fn estimate(
    signal: &[f32],
    group: usize,
    algorithm: Algorithm,
    calibration: &CalibrationTable,
) -> Estimate {
    let range = group * VA_CHANNELS..(group + 1) * VA_CHANNELS;
    match (
        signal.get(range.clone()),
        calibration.channels().get(range),
    ) {
        (Some(s), Some(c)) => estimate_group(s, c, algorithm),
        _ => Estimate::INVALID,
    }
}

/// Estimate the offset of one group from its samples and their calibration.
///
/// Bad channels and saturated samples do not take part. A group with no
/// usable channel left has no estimate.
pub fn estimate_group(
    samples: &[f32],
    channels: &[ChannelCalibration],
    algorithm: Algorithm,
) -> Estimate {
    let usable: Vec<f32> = samples
        .iter()
        .zip(channels)
        .filter(|(s, c)| c.status == Status::Good && s.abs() < ADC_CEILING)
        .map(|(&s, _)| s)
        .collect();
    if usable.is_empty() {
        return Estimate::INVALID;
    }
    match algorithm {
        Algorithm::Mean => Estimate::of(mean(&usable)),
        Algorithm::TrimmedMean => Estimate::of(trimmed_mean(usable)),
        Algorithm::ClippedMean => match clipped_mean(usable) {
            Some(v) => Estimate::of(v),
            None => Estimate::INVALID,
        },
    }
}

/// Remove a group's offset.
///
/// When the offset is not usable every channel of the group is zeroed, as
/// none of them has a trustworthy baseline. Returns whether it was usable.
pub fn apply_group(samples: &mut [f32], estimate: Estimate, max_common_noise: f32) -> bool {
    if estimate.usable(max_common_noise) {
        for s in samples.iter_mut() {
            *s -= estimate.value;
        }
        true
    } else {
        for s in samples.iter_mut() {
            *s = 0.0;
        }
        false
    }
}

fn mean(xs: &[f32]) -> f32 {
    let sum: f64 = xs.iter().map(|&x| x as f64).sum();
    (sum / xs.len() as f64) as f32
}

fn trimmed_mean(xs: Vec<f32>) -> f32 {
    let sorted = xs
        .into_iter()
        .sorted_by(|a, b| a.total_cmp(b))
        .collect::<Vec<_>>();
    let cut = sorted.len() / 4;
    let core = &sorted[cut..sorted.len() - cut];
    mean(core)
}

fn clipped_mean(mut xs: Vec<f32>) -> Option<f32> {
    for _ in 0..10 {
        let m = mean(&xs) as f64;
        let var = xs.iter().map(|&x| (x as f64 - m).powi(2)).sum::<f64>() / xs.len() as f64;
        let cut = 2.5 * var.sqrt();
        let before = xs.len();
        xs.retain(|&x| (x as f64 - m).abs() <= cut);
        if xs.is_empty() {
            return None;
        }
        if xs.len() == before {
            break;
        }
    }
    Some(mean(&xs))
}
