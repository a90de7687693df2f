//! Per-channel calibration: pedestals, noise and channel status

use crate::error::CalibrationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Good,
    Bad,
}

impl Status {
    /// Calibration files flag good channels with 0 and anything else as bad
    pub fn from_flag(flag: f32) -> Status {
        if flag == 0.0 {
            Status::Good
        } else {
            Status::Bad
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct ChannelCalibration {
    pub pedestal: f32,
    pub raw_sigma: f32,
    pub sigma: f32,
    pub status: Status,
}

/// Calibration of every channel of one sensor side, in channel order.
///
/// A table is never modified once built: dynamic recalibration produces a
/// new table which replaces the old one as a whole.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CalibrationTable {
    channels: Vec<ChannelCalibration>,
}

impl CalibrationTable {
    pub fn load(records: impl IntoIterator<Item = ChannelCalibration>) -> Self {
        CalibrationTable {
            channels: records.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> &[ChannelCalibration] {
        &self.channels
    }

    /// Noise of channel `ch`. Panics if `ch` is out of range.
    #[inline]
    pub fn sigma(&self, ch: usize) -> f32 {
        self.channels[ch].sigma
    }

    #[inline]
    pub fn status(&self, ch: usize) -> Status {
        self.channels[ch].status
    }

    /// Fails unless the table covers exactly `len` channels
    pub fn check_len(&self, len: usize) -> Result<(), CalibrationError> {
        if self.channels.len() != len {
            return Err(CalibrationError::LengthMismatch {
                expected: self.channels.len(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Pedestal-subtracted value of one raw sample, zero for bad channels.
    /// Panics if `ch` is out of range.
    #[inline]
    pub fn correct(&self, raw: u32, ch: usize, invert: bool) -> f32 {
        let c = &self.channels[ch];
        if c.status != Status::Good {
            return 0.0;
        }
        let s = raw as f32 - c.pedestal;
        if invert {
            -s
        } else {
            s
        }
    }

    /// Pedestal-subtract a whole sample vector
    pub fn subtract(&self, raw: &[u32], invert: bool) -> Result<Vec<f32>, CalibrationError> {
        self.check_len(raw.len())?;
        let signal = raw
            .iter()
            .enumerate()
            .map(|(ch, &r)| self.correct(r, ch, invert))
            .collect();
        Ok(signal)
    }

    /// Build a new table whose pedestals and raw sigmas come from a Gaussian
    /// fit of each channel's accumulated raw ADC distribution.
    ///
    /// Channels without entries get a zero pedestal and raw sigma. Sigma and
    /// status are carried over unchanged.
    pub fn update_from_histograms(
        &self,
        histograms: &[AdcHistogram],
    ) -> Result<CalibrationTable, CalibrationError> {
        self.check_len(histograms.len())?;
        let channels = self
            .channels
            .iter()
            .zip(histograms)
            .map(|(old, h)| {
                let (pedestal, raw_sigma) = h.fit_gaussian().unwrap_or((0.0, 0.0));
                ChannelCalibration {
                    pedestal,
                    raw_sigma,
                    ..*old
                }
            })
            .collect();
        Ok(CalibrationTable { channels })
    }
}

/// Distribution of raw ADC values of a single channel, one bin per count
#[derive(Clone, PartialEq, Debug, Default)]
pub struct AdcHistogram {
    bins: BTreeMap<u32, u64>,
    entries: u64,
}

impl AdcHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(&mut self, adc: u32) {
        *self.bins.entry(adc).or_insert(0) += 1;
        self.entries += 1;
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn reset(&mut self) {
        self.bins.clear();
        self.entries = 0;
    }

    /// Mean and standard deviation of the Gaussian core of the distribution.
    ///
    /// The first estimate uses every entry; it is then refined on the entries
    /// within three standard deviations, which keeps hits in the tail from
    /// dragging the pedestal. `None` if the histogram is empty.
    pub fn fit_gaussian(&self) -> Option<(f32, f32)> {
        let (mut mean, mut sigma) = moments(self.bins.iter())?;
        for _ in 0..3 {
            if sigma <= 0.0 {
                break;
            }
            let (lo, hi) = (mean - 3.0 * sigma, mean + 3.0 * sigma);
            let core = self.bins.iter().filter(|(&x, _)| {
                let x = x as f64;
                x >= lo && x <= hi
            });
            match moments(core) {
                Some((m, s)) => {
                    mean = m;
                    sigma = s;
                }
                None => break,
            }
        }
        Some((mean as f32, sigma as f32))
    }
}

fn moments<'a>(bins: impl Iterator<Item = (&'a u32, &'a u64)>) -> Option<(f64, f64)> {
    let (mut n, mut sum, mut sum2) = (0f64, 0f64, 0f64);
    for (&x, &w) in bins {
        let (x, w) = (x as f64, w as f64);
        n += w;
        sum += w * x;
        sum2 += w * x * x;
    }
    if n == 0.0 {
        return None;
    }
    let mean = sum / n;
    let var = (sum2 / n - mean * mean).max(0.0);
    Some((mean, var.sqrt()))
}
