//! Error types for the decoding and clustering stages

use thiserror::Error;

/// Problems found while walking a raw byte stream
#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
    #[error("no run header sync pattern found in {scanned} bytes")]
    NoSyncFound { scanned: usize },

    #[error("payload at offset {offset} needs {expected} bytes, only {available} left")]
    TruncatedPayload {
        offset: usize,
        expected: usize,
        available: usize,
    },

    #[error("board {board} of trigger {trigger}: {source}")]
    Demux {
        board: i32,
        trigger: u32,
        #[source]
        source: DemuxError,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DemuxError {
    #[error("cannot demultiplex {actual} samples, the topology needs exactly {expected}")]
    Length { expected: usize, actual: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("calibration has {expected} channels but the event has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("calibration source contains no channels")]
    Empty,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("unknown common noise algorithm {0} (expected 0, 1 or 2)")]
    UnknownAlgorithm(u8),

    #[error("unknown detector version {0} (expected 1212, 1313 or 2020)")]
    UnknownVersion(u32),

    #[error("channel count {channels} is not {groups} groups of {group_size}")]
    GroupMismatch {
        channels: usize,
        groups: usize,
        group_size: usize,
    },

    #[error("low threshold {low} is above high threshold {high}")]
    Thresholds { low: f32, high: f32 },

    #[error("strip window [{min}, {max}] is empty or outside {channels} channels")]
    StripWindow {
        min: usize,
        max: usize,
        channels: usize,
    },

    #[error("side {0} does not exist, boards have two sides")]
    Side(usize),

    #[error("dynamic pedestal period must be positive")]
    PedestalPeriod,

    #[error("at least one board must be read out per trigger")]
    NoBoards,
}
