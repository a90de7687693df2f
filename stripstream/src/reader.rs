use striptools::error::FrameError;
use striptools::frame::{self, FrameScanner};
use striptools::Event;
use tracing::debug;

pub type ScanResult = Result<Event, FrameError>;

/// Scans a run in the background, sending one event per trigger.
///
/// The run start is located before the thread is spawned, so a stream
/// without one is reported here. Scanning stops early when the receiver
/// is dropped.
pub fn main(bytes: Vec<u8>, boards: usize, sender: flume::Sender<ScanResult>) -> Result<(), FrameError> {
    let start = frame::locate_run_start(&bytes)?;
    std::thread::spawn(move || {
        let scanner = FrameScanner::starting_at(&bytes, start, boards);
        for ev in scanner.events() {
            if sender.send(ev).is_err() {
                debug!("event receiver closed, stopping scan");
                break;
            }
        }
    });
    Ok(())
}
