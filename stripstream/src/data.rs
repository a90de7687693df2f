use std::collections::BTreeMap;
use striptools::calib::{AdcHistogram, CalibrationTable, Status};
use striptools::cfg::{Config, MaxAdc, NoiseSummary, RunRecord};
use striptools::clus;
use striptools::cn::{self, Algorithm};
use striptools::error::CalibrationError;
use striptools::{feat, Cluster, ADC_CEILING, VA_CHANNELS};
use thiserror::Error;

/// Reasons a single event is dropped. Everything except `Calibration` is
/// expected to happen now and then and only skips the event.
#[derive(Error, Debug, PartialEq)]
pub enum EventError {
    #[error("board {0} was not read out")]
    MissingBoard(i32),

    #[error("event has {len} channels, expected {expected}")]
    Incomplete { len: usize, expected: usize },

    #[error("common noise of VA {group} is not usable")]
    BadCommonNoise { group: usize },

    #[error("strip {strip} reads {value}, above the ADC range")]
    AboveCeiling { value: f32, strip: usize },

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

impl EventError {
    /// Key under which the event is counted in the run record
    pub fn reason(&self) -> &'static str {
        match self {
            EventError::MissingBoard(_) => "missing_board",
            EventError::Incomplete { .. } => "incomplete",
            EventError::BadCommonNoise { .. } => "bad_common_noise",
            EventError::AboveCeiling { .. } => "above_ceiling",
            EventError::Calibration(_) => "calibration",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, EventError::Calibration(_))
    }
}

/// Running mean and rms of accepted common-mode estimates
#[derive(Clone, Copy, Debug, Default)]
pub struct NoiseMonitor {
    entries: u64,
    sum: f64,
    sum2: f64,
}

impl NoiseMonitor {
    pub fn fill(&mut self, value: f32) {
        let v = value as f64;
        self.entries += 1;
        self.sum += v;
        self.sum2 += v * v;
    }

    pub fn summary(&self) -> NoiseSummary {
        if self.entries == 0 {
            return NoiseSummary::default();
        }
        let n = self.entries as f64;
        let mean = self.sum / n;
        NoiseSummary {
            entries: self.entries,
            mean,
            rms: (self.sum2 / n - mean * mean).max(0.0).sqrt(),
        }
    }
}

/// Accumulators of one run, threaded through every event
pub struct RunContext {
    pub events: u64,
    pub processed: u64,
    pub skipped: BTreeMap<&'static str, u64>,
    pub clusters: u64,
    pub accepted: u64,
    pub widths: [u64; 3],
    pub too_many_seeds: u64,
    pub pedestal_updates: u64,
    pub max_adc: Option<MaxAdc>,
    pub histograms: Vec<AdcHistogram>,
    pub noise: [NoiseMonitor; 3],
}

impl RunContext {
    pub fn new(channels: usize) -> Self {
        RunContext {
            events: 0,
            processed: 0,
            skipped: BTreeMap::new(),
            clusters: 0,
            accepted: 0,
            widths: [0; 3],
            too_many_seeds: 0,
            pedestal_updates: 0,
            max_adc: None,
            histograms: vec![AdcHistogram::new(); channels],
            noise: [NoiseMonitor::default(); 3],
        }
    }

    pub fn skip(&mut self, reason: &'static str) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    /// Whether the pedestals are due to be refitted before event `event`
    pub fn pedestals_due(&self, config: &Config, event: u64) -> bool {
        config.dynamic_pedestal && event > 0 && event % config.dynamic_pedestal_period == 0
    }

    /// Refit the pedestals from the histograms gathered so far and start
    /// gathering anew
    pub fn refit_pedestals(
        &mut self,
        calibration: &CalibrationTable,
    ) -> Result<CalibrationTable, CalibrationError> {
        let table = calibration.update_from_histograms(&self.histograms)?;
        for h in self.histograms.iter_mut() {
            h.reset();
        }
        self.pedestal_updates += 1;
        Ok(table)
    }

    /// Correct one side of one event and return its accepted clusters.
    ///
    /// `event` is the running event number, used to locate the largest
    /// signal of the run.
    pub fn process_event(
        &mut self,
        config: &Config,
        calibration: &CalibrationTable,
        event: u64,
        raw: &[u32],
    ) -> Result<Vec<Cluster>, EventError> {
        if raw.len() != config.channel_count {
            return Err(EventError::Incomplete {
                len: raw.len(),
                expected: config.channel_count,
            });
        }
        let mut signal = calibration.subtract(raw, config.invert_polarity)?;

        if config.dynamic_pedestal {
            for ((h, &r), c) in self.histograms.iter_mut().zip(raw).zip(calibration.channels()) {
                if c.status == Status::Good {
                    h.fill(r);
                }
            }
        }

        for (monitor, &algorithm) in self.noise.iter_mut().zip(Algorithm::ALL.iter()) {
            for group in 0..config.group_count {
                let e = cn::estimate(&signal, group, algorithm, calibration);
                if e.usable(config.max_common_noise) {
                    monitor.fill(e.value);
                }
            }
        }

        subtract_common_noise(
            &mut signal,
            calibration,
            config.common_noise_algorithm,
            config.max_common_noise,
        )?;

        if let Some((strip, &value)) = signal
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
        {
            if value > ADC_CEILING {
                return Err(EventError::AboveCeiling { value, strip });
            }
            if self.max_adc.map_or(true, |m| value > m.value) {
                self.max_adc = Some(MaxAdc { value, event, strip });
            }
        }

        let clustering = clus::clusterize(calibration, &signal, &config.cluster_params())?;
        if clustering.too_many_seeds(config.max_clusters) {
            self.too_many_seeds += 1;
        }
        self.clusters += clustering.clusters.len() as u64;

        let accepted = clustering
            .clusters
            .into_iter()
            .filter(|c| {
                feat::good_cluster(c, calibration, config.high_threshold)
                    && feat::in_strips(c, config.min_strip, config.max_strip)
            })
            .collect::<Vec<_>>();
        for c in accepted.iter() {
            self.widths[c.width.clamp(1, 3) - 1] += 1;
        }
        self.accepted += accepted.len() as u64;
        self.processed += 1;
        Ok(accepted)
    }

    /// Summary of the run so far
    pub fn record(&self, config: &Config) -> RunRecord {
        RunRecord {
            name: config.name.clone(),
            timestamp: None,
            config: config.clone(),
            events: self.events,
            processed: self.processed,
            skipped: self
                .skipped
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            clusters: self.clusters,
            accepted: self.accepted,
            widths: self.widths,
            too_many_seeds: self.too_many_seeds,
            pedestal_updates: self.pedestal_updates,
            max_adc: self.max_adc,
            common_noise: self.noise.iter().map(NoiseMonitor::summary).collect(),
        }
    }
}

/// Remove the common-mode offset of every VA, doing the groups in parallel.
///
/// A group without a usable offset is zeroed; the event is then reported
/// bad with the lowest such group.
pub fn subtract_common_noise(
    signal: &mut [f32],
    calibration: &CalibrationTable,
    algorithm: Algorithm,
    max_common_noise: f32,
) -> Result<(), EventError> {
    use rayon::prelude::*;

    let bad = signal
        .par_chunks_mut(VA_CHANNELS)
        .zip(calibration.channels().par_chunks(VA_CHANNELS))
        .enumerate()
        .filter_map(|(group, (samples, channels))| {
            let e = cn::estimate_group(samples, channels, algorithm);
            match cn::apply_group(samples, e, max_common_noise) {
                true => None,
                false => Some(group),
            }
        })
        .min();
    match bad {
        Some(group) => Err(EventError::BadCommonNoise { group }),
        None => Ok(()),
    }
}
