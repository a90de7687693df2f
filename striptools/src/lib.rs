pub mod calib;
pub mod cfg;
pub mod clus;
pub mod cn;
pub mod de;
pub mod demux;
pub mod error;
pub mod feat;
pub mod frame;
pub mod ser;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A contiguous run of strips attributed to a single particle hit
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Cluster {
    /// First strip of the cluster
    pub address: usize,
    /// Number of strips, always equal to `samples.len()`
    pub width: usize,
    /// Corrected signal of each strip, in strip order
    pub samples: Vec<f32>,
    /// Number of strips above the high (seed) threshold
    pub over: usize,
}

impl Cluster {
    pub fn new(address: usize, samples: Vec<f32>, over: usize) -> Self {
        Cluster {
            address,
            width: samples.len(),
            samples,
            over,
        }
    }

    /// Last strip of the cluster (inclusive)
    pub fn last(&self) -> usize {
        self.address + self.width.saturating_sub(1)
    }
}

/// Readout board framing, selected by the firmware version in each board header
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// 10 ADC lanes of 128 channels, no padding
    Standard,
    /// 2 ADC lanes of 192 channels, 1 KiB padding after the payload
    Ladder,
}

impl Variant {
    pub fn from_firmware(fw: u64) -> Variant {
        match fw {
            LADDER_FIRMWARE => Variant::Ladder,
            _ => Variant::Standard,
        }
    }

    /// Order in which the ADC lanes appear in the raw stream
    pub fn lane_order(self) -> &'static [usize] {
        match self {
            Variant::Standard => &[1, 0, 3, 2, 5, 4, 7, 6, 9, 8],
            Variant::Ladder => &[1, 0],
        }
    }

    /// Channels read out by each ADC lane
    pub fn lane_channels(self) -> usize {
        match self {
            Variant::Standard => 128,
            Variant::Ladder => 192,
        }
    }

    /// Total number of samples in one board block
    pub fn block_len(self) -> usize {
        self.lane_order().len() * self.lane_channels()
    }

    /// Bytes of padding between the payload and the board trailer
    pub fn padding(self) -> usize {
        match self {
            Variant::Standard => 0,
            Variant::Ladder => 1024,
        }
    }

    /// Correction applied to the board id written by the firmware
    pub fn board_offset(self) -> i32 {
        match self {
            Variant::Standard => 0,
            Variant::Ladder => -300,
        }
    }
}

/// Demultiplexed samples of one board, split into its two sensor sides
#[derive(Clone, PartialEq, Debug, Default)]
pub struct BoardEvent {
    pub sides: [Vec<u32>; 2],
}

/// Everything read out for a single trigger
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Event {
    pub trigger_id: u32,
    pub timestamp: u16,
    pub boards: BTreeMap<i32, BoardEvent>,
}

impl Event {
    /// Samples of one side of one board, if that board was read out
    pub fn side(&self, board: i32, side: usize) -> Option<&[u32]> {
        self.boards
            .get(&board)
            .and_then(|b| b.sides.get(side))
            .map(|s| s.as_slice())
    }
}

/// Demultiplexed samples of one side of one board, as stored on disk
#[derive(Clone, PartialEq, Debug)]
pub struct RawRecord {
    pub trigger_id: u32,
    pub board: i32,
    pub side: usize,
    pub samples: Vec<u32>,
}

/// An accepted cluster together with where it was found, as stored on disk
#[derive(Clone, PartialEq, Debug)]
pub struct ClusterRecord {
    pub event: u64,
    pub board: i32,
    pub side: usize,
    pub cluster: Cluster,
}

/// Firmware tag of the ladder readout
pub const LADDER_FIRMWARE: u64 = 0xffff_ffff_9fd6_8b40;
/// Channels sharing one VA chip and its common-mode noise
pub const VA_CHANNELS: usize = 64;
/// Largest value the ADC can produce
pub const ADC_CEILING: f32 = 4096.0;
/// Value reported by estimators that have no sensible answer
pub const SENTINEL: f32 = -999.0;
pub const MAX_CLUSTERS: usize = 10;
