//! Deserialization of calibration files, raw events and clusters

use crate::calib::{CalibrationTable, ChannelCalibration, Status};
use crate::error::CalibrationError;
use crate::{Cluster, ClusterRecord, RawRecord};
use anyhow::{bail, Result};
use std::io::{BufRead, BufReader, Read};
use zstd::stream;

/// Lines of free text ahead of the channel records in a calibration file
pub const CALIBRATION_HEADER_LINES: usize = 18;

/// Tab-separated reader accepting records of any length
pub fn tsv_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(b'\t')
        .from_reader(rdr)
}

/// Read a calibration file with the standard header length
pub fn calibration(rdr: impl Read) -> Result<CalibrationTable> {
    calibration_skip(rdr, CALIBRATION_HEADER_LINES)
}

/// Read a calibration file: `header_lines` lines of free text, then one
/// comma-separated record per channel,
///
/// `strip, va, va_channel, pedestal, raw_sigma, sigma, status, spare`
///
/// Records with a negative strip number are ignored. Status 0 is a good
/// channel, anything else a bad one.
pub fn calibration_skip(rdr: impl Read, header_lines: usize) -> Result<CalibrationTable> {
    let mut brdr = BufReader::new(rdr);
    let mut line = String::new();
    for _ in 0..header_lines {
        line.clear();
        if brdr.read_line(&mut line)? == 0 {
            break;
        }
    }

    let mut crdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(brdr);
    let mut channels = Vec::new();
    for result in crdr.records() {
        let record = result?;
        if record.len() < 8 {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            bail!(
                "calibration record at line {} has {} fields, expected 8",
                line as usize + header_lines,
                record.len()
            );
        }
        let strip = record[0].parse::<f32>()?;
        if strip < 0.0 {
            continue;
        }
        channels.push(ChannelCalibration {
            pedestal: record[3].parse()?,
            raw_sigma: record[4].parse()?,
            sigma: record[5].parse()?,
            status: Status::from_flag(record[6].parse()?),
        });
    }
    if channels.is_empty() {
        return Err(CalibrationError::Empty.into());
    }
    Ok(CalibrationTable::load(channels))
}

/// Deserialize raw events from tab-separated values
/// (trigger, board, side, samples...).
pub fn raw_events(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<RawRecord>> {
    let mut events = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() < 3 {
            bail!("raw event record with {} fields", record.len());
        }
        let samples = record
            .iter()
            .skip(3)
            .map(|s| s.parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        events.push(RawRecord {
            trigger_id: record[0].parse()?,
            board: record[1].parse()?,
            side: record[2].parse()?,
            samples,
        });
    }
    Ok(events)
}

/// Deserialize zstd-compressed tab-separated raw events
pub fn raw_events_zst(rdr: impl Read) -> Result<Vec<RawRecord>> {
    let zrdr = stream::read::Decoder::new(rdr)?;
    let events = raw_events(&mut tsv_reader(zrdr))?;
    Ok(events)
}

/// Deserialize clusters from tab-separated values
/// (event, board, side, address, width, over, cog, signal, samples...).
/// The derived cog and signal columns are skipped.
pub fn clusters(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<ClusterRecord>> {
    let mut clusters = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() < 8 {
            bail!("cluster record with {} fields", record.len());
        }
        let samples = record
            .iter()
            .skip(8)
            .map(|s| s.parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let width = record[4].parse::<usize>()?;
        if width != samples.len() {
            bail!("cluster of width {} with {} samples", width, samples.len());
        }
        clusters.push(ClusterRecord {
            event: record[0].parse()?,
            board: record[1].parse()?,
            side: record[2].parse()?,
            cluster: Cluster::new(record[3].parse()?, samples, record[5].parse()?),
        });
    }
    Ok(clusters)
}
