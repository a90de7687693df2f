//! Seed finding and cluster formation on corrected signal vectors

use crate::calib::CalibrationTable;
use crate::error::CalibrationError;
use crate::{Cluster, MAX_CLUSTERS};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the extent of a cluster around its seed is decided
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Fixed window of `2 * window + 1` strips centered on the seed
    Symmetric,
    /// Grow from the seed while neighbours pass the low threshold
    DoubleThreshold,
}

/// Clustering parameters. Thresholds are in ADC counts when `absolute`,
/// otherwise in units of each strip's sigma.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Params {
    pub high: f32,
    pub low: f32,
    pub mode: Mode,
    pub window: usize,
    pub absolute: bool,
    pub max_clusters: usize,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            high: 3.5,
            low: 1.0,
            mode: Mode::DoubleThreshold,
            window: 0,
            absolute: false,
            max_clusters: MAX_CLUSTERS,
        }
    }
}

/// Clusters of one signal vector
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
    /// Number of seeds found, which may exceed `max_clusters`
    pub seeds: usize,
}

impl Clustering {
    pub fn too_many_seeds(&self, max_clusters: usize) -> bool {
        self.seeds > max_clusters
    }
}

/// Threshold-comparable value of strip `i`
#[inline]
fn level(calibration: &CalibrationTable, signal: &[f32], i: usize, absolute: bool) -> f32 {
    if absolute {
        signal[i]
    } else {
        signal[i] / calibration.sigma(i)
    }
}

/// Starting strip of every contiguous run of strips above `high`
pub fn seeds(calibration: &CalibrationTable, signal: &[f32], high: f32, absolute: bool) -> Vec<usize> {
    let candidates = (0..signal.len())
        .filter(|&i| level(calibration, signal, i, absolute) > high)
        .collect::<Vec<_>>();
    let mut seeds = Vec::with_capacity(candidates.len());
    if let Some(&first) = candidates.first() {
        seeds.push(first);
    }
    for (prev, next) in candidates.iter().tuple_windows() {
        if next - prev != 1 {
            seeds.push(*next);
        }
    }
    seeds
}

/// Find the clusters of a corrected signal vector.
///
/// Seeds are the first strips of runs above the high threshold. Finding more
/// than `max_clusters` seeds is reported in the result, but every seed is
/// still clustered. Clusters are neither merged nor deduplicated, so adjacent
/// seeds may give overlapping symmetric windows.
pub fn clusterize(
    calibration: &CalibrationTable,
    signal: &[f32],
    params: &Params,
) -> Result<Clustering, CalibrationError> {
    calibration.check_len(signal.len())?;
    let n = signal.len();
    let lvl = |i: usize| level(calibration, signal, i, params.absolute);

    let seeds = seeds(calibration, signal, params.high, params.absolute);
    if seeds.len() > params.max_clusters {
        debug!(
            seeds = seeds.len(),
            max = params.max_clusters,
            "too many seeds, check the thresholds"
        );
    }

    let mut clusters = Vec::with_capacity(seeds.len());
    for &seed in seeds.iter() {
        let (first, last) = match params.mode {
            Mode::Symmetric => {
                // A window starting at strip 0 is rejected, like left growth
                let w = params.window;
                if seed <= w || seed + w >= n {
                    continue;
                }
                (seed - w, seed + w)
            }
            Mode::DoubleThreshold => {
                // Strip 0 is never reached when growing to the left
                let mut first = seed;
                while first > 1 && lvl(first - 1) > params.low {
                    first -= 1;
                }
                let mut last = seed;
                while last + 1 < n && lvl(last + 1) > params.low {
                    last += 1;
                }
                (first, last)
            }
        };
        let over = (first..=last).filter(|&i| lvl(i) > params.high).count();
        clusters.push(Cluster::new(first, signal[first..=last].to_vec(), over));
    }

    Ok(Clustering {
        clusters,
        seeds: seeds.len(),
    })
}
