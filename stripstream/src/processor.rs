use anyhow::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use striptools::calib::CalibrationTable;
use striptools::cfg::{Config, RunRecord};
use striptools::error::FrameError;
use striptools::ClusterRecord;
use tracing::{debug, info, span, warn, Level};

use crate::data::{EventError, RunContext};
use crate::reader::ScanResult;
use crate::save::SaveMessage;

/// Events between progress reports
pub const PROGRESS: u64 = 10_000;

/// Calibration shared with whoever wants to look at it during the run.
/// Readers clone the inner `Arc` and keep a consistent table for a whole
/// event; refits replace it as a whole.
pub type SharedCalibration = Arc<RwLock<Arc<CalibrationTable>>>;

/// Processes events from `receiver` until it runs dry or the event limit
/// is reached.
///
/// Accepted clusters of every event, and the raw events themselves when
/// `save_raw` is set, are passed on to the save thread. Events that fail
/// are counted and skipped; only a calibration that does not fit the data
/// ends the run with an error.
pub fn run(
    config: &Config,
    calibration: SharedCalibration,
    receiver: flume::Receiver<ScanResult>,
    save: &flume::Sender<SaveMessage>,
    save_raw: bool,
) -> Result<RunRecord> {
    let span = span!(Level::INFO, "run", name = %config.name, board = config.board, side = config.side);
    let _enter = span.enter();

    let mut ctx = RunContext::new(config.channel_count);
    for result in receiver.iter() {
        if config.nevents.map_or(false, |n| ctx.events >= n) {
            info!(events = ctx.events, "event limit reached");
            break;
        }
        let event = match result {
            Ok(ev) => ev,
            Err(e @ FrameError::Demux { .. }) => {
                ctx.events += 1;
                warn!(%e, "skipping trigger");
                ctx.skip("demux");
                continue;
            }
            Err(e) => {
                warn!(%e, "stopping scan");
                break;
            }
        };
        ctx.events += 1;
        let n = ctx.events;

        if ctx.pedestals_due(config, n) {
            let current = calibration.read().clone();
            let table = ctx.refit_pedestals(&current)?;
            *calibration.write() = Arc::new(table);
            info!(event = n, "pedestals updated");
        }
        let cal = calibration.read().clone();

        let outcome = match event.side(config.board, config.side) {
            Some(raw) => ctx.process_event(config, &cal, n, raw),
            None => Err(EventError::MissingBoard(config.board)),
        };
        match outcome {
            Ok(clusters) => {
                if !clusters.is_empty() {
                    let records = clusters
                        .into_iter()
                        .map(|cluster| ClusterRecord {
                            event: n,
                            board: config.board,
                            side: config.side,
                            cluster,
                        })
                        .collect();
                    if save.send(SaveMessage::Clusters(records)).is_err() {
                        warn!("save thread stopped");
                        break;
                    }
                }
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                debug!(event = n, %e, "skipping event");
                ctx.skip(e.reason());
            }
        }

        if save_raw && save.send(SaveMessage::Raw(event)).is_err() {
            warn!("save thread stopped");
            break;
        }
        if n % PROGRESS == 0 {
            info!(events = n, processed = ctx.processed, accepted = ctx.accepted, "progress");
        }
    }

    info!(
        events = ctx.events,
        processed = ctx.processed,
        skipped = ctx.skipped.values().sum::<u64>(),
        accepted = ctx.accepted,
        "run done"
    );
    Ok(ctx.record(config))
}
