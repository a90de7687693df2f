//! Serialization of raw events and clusters as `.tsv`, optionally zstd-compressed

use crate::calib::{CalibrationTable, Status};
use crate::feat;
use crate::{ClusterRecord, Event, RawRecord};
use anyhow::Result;
use std::io::Write;
use zstd::stream;

/// Tab-separated writer accepting records of any length
pub fn tsv_writer<W: Write>(wtr: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(b'\t')
        .from_writer(wtr)
}

/// Serialize one raw record (trigger, board, side, samples...)
pub fn raw_record(wtr: &mut csv::Writer<impl Write>, r: &RawRecord) -> Result<()> {
    let mut row = Vec::with_capacity(r.samples.len() + 3);
    row.push(r.trigger_id.to_string());
    row.push(r.board.to_string());
    row.push(r.side.to_string());
    row.extend(r.samples.iter().map(|s| s.to_string()));
    wtr.write_record(&row)?;
    Ok(())
}

/// Serialize every side of every board of an event
pub fn event(wtr: &mut csv::Writer<impl Write>, ev: &Event) -> Result<()> {
    for (&board, b) in ev.boards.iter() {
        for (side, samples) in b.sides.iter().enumerate() {
            raw_record(
                wtr,
                &RawRecord {
                    trigger_id: ev.trigger_id,
                    board,
                    side,
                    samples: samples.clone(),
                },
            )?;
        }
    }
    Ok(())
}

/// Serialize raw events to zstd-compressed tab-separated values
///
/// Like the decoder, zstd frames concatenate, so repeated calls on the same
/// writer produce a stream that [`crate::de::raw_events_zst`] reads whole.
pub fn raw_events_zst(wtr: &mut impl Write, events: &[RawRecord]) -> Result<()> {
    let zwtr = stream::write::Encoder::new(wtr, 0)?;
    let mut cwtr = tsv_writer(zwtr);
    for r in events {
        raw_record(&mut cwtr, r)?;
    }
    let zwtr = cwtr.into_inner().map_err(|e| e.into_error())?;
    zwtr.finish()?;
    Ok(())
}

/// Serialize clusters (event, board, side, address, width, over, cog,
/// signal, samples...). The cog and signal columns are for reading by eye
/// and are recomputed on load.
pub fn clusters(wtr: &mut csv::Writer<impl Write>, records: &[ClusterRecord]) -> Result<()> {
    for r in records {
        let c = &r.cluster;
        let mut row = vec![
            r.event.to_string(),
            r.board.to_string(),
            r.side.to_string(),
            c.address.to_string(),
            c.width.to_string(),
            c.over.to_string(),
            feat::center_of_gravity(c).to_string(),
            feat::signal_sum(c).to_string(),
        ];
        row.extend(c.samples.iter().map(|s| s.to_string()));
        wtr.write_record(&row)?;
    }
    Ok(())
}

/// Serialize a calibration table, one row per channel
/// (strip, pedestal, raw_sigma, sigma, status) with status 0 for good channels
pub fn calibration(wtr: &mut csv::Writer<impl Write>, table: &CalibrationTable) -> Result<()> {
    for (strip, c) in table.channels().iter().enumerate() {
        let status = match c.status {
            Status::Good => 0,
            Status::Bad => 1,
        };
        wtr.write_record(&[
            strip.to_string(),
            c.pedestal.to_string(),
            c.raw_sigma.to_string(),
            c.sigma.to_string(),
            status.to_string(),
        ])?;
    }
    Ok(())
}
