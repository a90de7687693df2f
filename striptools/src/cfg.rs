//! Configuration tools: formats for declaring and recording runs
//!
//! A run is declared as a JSON file deserialized into [`Config`]. Every field
//! may be omitted and falls back to the defaults of the 1313 detector, or to
//! the preset of the `version` given in the file. After processing, a
//! [`RunRecord`] with the configuration actually used and the run counters is
//! written next to the output.

use crate::clus::{self, Mode};
use crate::cn::Algorithm;
use crate::error::ConfigError;
use crate::{MAX_CLUSTERS, VA_CHANNELS};
use chrono::{offset::Local, DateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Readout hardware generations
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DetectorVersion {
    /// 6 VA miniTRB, 384 strips
    V1212 = 1212,
    /// 10 VA miniTRB, 640 strips
    V1313 = 1313,
    /// Multi-board DAQ, 640 strips per side, two sides per board
    V2020 = 2020,
}

impl TryFrom<u32> for DetectorVersion {
    type Error = ConfigError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            1212 => Ok(DetectorVersion::V1212),
            1313 => Ok(DetectorVersion::V1313),
            2020 => Ok(DetectorVersion::V2020),
            v => Err(ConfigError::UnknownVersion(v)),
        }
    }
}

impl From<DetectorVersion> for u32 {
    fn from(v: DetectorVersion) -> u32 {
        v as u32
    }
}

impl DetectorVersion {
    /// Channel count, VA count and strip pitch in mm
    pub fn geometry(self) -> (usize, usize, f32) {
        match self {
            DetectorVersion::V1212 => (384, 6, 0.242),
            DetectorVersion::V1313 | DetectorVersion::V2020 => (640, 10, 0.150),
        }
    }
}

/// Processing configuration of one run
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub name: String,
    pub version: DetectorVersion,
    pub channel_count: usize,
    pub group_count: usize,
    /// Strip pitch in mm
    pub sensor_pitch: f32,
    pub high_threshold: f32,
    pub low_threshold: f32,
    pub cluster_mode: Mode,
    pub window_width: usize,
    pub absolute_threshold: bool,
    pub common_noise_algorithm: Algorithm,
    pub max_common_noise: f32,
    pub min_strip: usize,
    pub max_strip: usize,
    pub invert_polarity: bool,
    pub dynamic_pedestal: bool,
    pub dynamic_pedestal_period: u64,
    pub max_clusters: usize,
    /// Boards read out per trigger
    pub boards: usize,
    /// Board and side whose strips are clustered
    pub board: i32,
    pub side: usize,
    /// Signal of a minimum ionizing particle, in ADC counts
    pub mip_adc: f32,
    /// Stop after this many events
    pub nevents: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config::preset(DetectorVersion::V1313)
    }
}

impl Config {
    /// Defaults for a given detector version
    pub fn preset(version: DetectorVersion) -> Self {
        let (channel_count, group_count, sensor_pitch) = version.geometry();
        Config {
            name: String::new(),
            version,
            channel_count,
            group_count,
            sensor_pitch,
            high_threshold: 3.5,
            low_threshold: 1.0,
            cluster_mode: Mode::DoubleThreshold,
            window_width: 0,
            absolute_threshold: false,
            common_noise_algorithm: Algorithm::Mean,
            max_common_noise: 999.0,
            min_strip: 0,
            max_strip: channel_count - 1,
            invert_polarity: false,
            dynamic_pedestal: false,
            dynamic_pedestal_period: 5000,
            max_clusters: MAX_CLUSTERS,
            boards: 1,
            board: 0,
            side: 0,
            mip_adc: 30.0,
            nevents: None,
        }
    }

    /// Parse a configuration from JSON.
    ///
    /// Fields not given in the text come from the preset of the `version`
    /// the text names, so `{"version": 1212}` is a complete 1212 setup.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;
        let version = match value.get("version") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => DetectorVersion::V1313,
        };
        let mut merged = serde_json::to_value(Config::preset(version))?;
        if let (Some(base), Some(given)) = (merged.as_object_mut(), value.as_object_mut()) {
            base.append(given);
        }
        let config = serde_json::from_value(merged)?;
        Ok(config)
    }

    /// Check the configuration for values that cannot work together
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_count != self.group_count * VA_CHANNELS {
            return Err(ConfigError::GroupMismatch {
                channels: self.channel_count,
                groups: self.group_count,
                group_size: VA_CHANNELS,
            });
        }
        if self.low_threshold > self.high_threshold {
            return Err(ConfigError::Thresholds {
                low: self.low_threshold,
                high: self.high_threshold,
            });
        }
        if self.min_strip > self.max_strip || self.max_strip >= self.channel_count {
            return Err(ConfigError::StripWindow {
                min: self.min_strip,
                max: self.max_strip,
                channels: self.channel_count,
            });
        }
        if self.side > 1 {
            return Err(ConfigError::Side(self.side));
        }
        if self.dynamic_pedestal && self.dynamic_pedestal_period == 0 {
            return Err(ConfigError::PedestalPeriod);
        }
        if self.boards == 0 {
            return Err(ConfigError::NoBoards);
        }
        Ok(())
    }

    pub fn cluster_params(&self) -> clus::Params {
        clus::Params {
            high: self.high_threshold,
            low: self.low_threshold,
            mode: self.cluster_mode,
            window: self.window_width,
            absolute: self.absolute_threshold,
            max_clusters: self.max_clusters,
        }
    }
}

/// Largest corrected signal seen in a run
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct MaxAdc {
    pub value: f32,
    pub event: u64,
    pub strip: usize,
}

/// Running mean and spread of the common-mode estimates of one algorithm
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct NoiseSummary {
    pub entries: u64,
    pub mean: f64,
    pub rms: f64,
}

/// Record of a processed run, written as JSON when the run ends
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct RunRecord {
    pub name: String,
    pub timestamp: Option<DateTime<Local>>,
    pub config: Config,
    pub events: u64,
    pub processed: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skipped: BTreeMap<String, u64>,
    pub clusters: u64,
    pub accepted: u64,
    /// Accepted clusters of width 1, 2 and more
    pub widths: [u64; 3],
    pub too_many_seeds: u64,
    pub pedestal_updates: u64,
    pub max_adc: Option<MaxAdc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_noise: Vec<NoiseSummary>,
}
