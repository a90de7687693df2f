//! Scanning of raw readout streams: run sync, board headers and payloads
//!
//! A run starts with a sync word, after which every trigger contributes one
//! block per connected board. All words are little-endian.
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 4    | magic `0xbaba1a9a`             |
//! | 4      | 4    | header length in 32-bit words  |
//! | 8      | 4    | payload length in bytes        |
//! | 12     | 8    | firmware version               |
//! | 20     | 4    | board id                       |
//! | 24     | 4    | trigger id                     |
//! | 28     | 2    | timestamp                      |
//! | 30     | 2    | reserved                       |
//!
//! The header is followed by the payload (one 32-bit word per sample), the
//! firmware-dependent padding and a 4-byte board trailer. The last board of
//! a trigger is closed by 8 bytes instead. There is no index of the blocks:
//! every offset is derived from the block before it.

use crate::demux;
use crate::error::FrameError;
use crate::{BoardEvent, Event, Variant};
use std::collections::BTreeMap;
use tracing::debug;

pub const RUN_SYNC: u32 = 0xfa4a_f1ca;
pub const BOARD_MAGIC: u32 = 0xbaba_1a9a;
pub const HEADER_LEN: usize = 32;
pub const SAMPLE_LEN: usize = 4;
pub const BOARD_TRAILER: usize = 4;
pub const TRIGGER_TRAILER: usize = 8;

/// Metadata of one board block. Identity is `(board_id, trigger_id)`.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct RawFrameHeader {
    /// Board id, already corrected for the firmware variant
    pub board_id: i32,
    pub firmware_version: u64,
    pub trigger_id: u32,
    pub timestamp: u16,
    pub event_byte_length: usize,
    /// Where the payload begins, i.e. the next read position of the scanner
    pub payload_offset: usize,
}

impl RawFrameHeader {
    pub fn variant(&self) -> Variant {
        Variant::from_firmware(self.firmware_version)
    }

    pub fn payload_end(&self) -> usize {
        self.payload_offset + self.event_byte_length
    }

    /// Offset of the next board header.
    ///
    /// Boards of the same trigger are separated by a 4-byte trailer, while
    /// a finished trigger is closed by 8 bytes.
    pub fn next_offset(&self, trigger_complete: bool) -> usize {
        let trailer = if trigger_complete {
            TRIGGER_TRAILER
        } else {
            BOARD_TRAILER
        };
        self.payload_end() + self.variant().padding() + trailer
    }
}

/// Raw (still interleaved) samples of one board
#[derive(Clone, PartialEq, Debug)]
pub struct Frame {
    pub header: RawFrameHeader,
    pub samples: Vec<u32>,
    /// Whether this board closed its trigger
    pub last_of_trigger: bool,
}

fn read_u16(stream: &[u8], at: usize) -> Option<u16> {
    let b = stream.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(stream: &[u8], at: usize) -> Option<u32> {
    let b = stream.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64(stream: &[u8], at: usize) -> Option<u64> {
    let lo = read_u32(stream, at)? as u64;
    let hi = read_u32(stream, at.checked_add(4)?)? as u64;
    Some(hi << 32 | lo)
}

/// Find the run header sync word and return the offset right after it.
pub fn locate_run_start(stream: &[u8]) -> Result<usize, FrameError> {
    let sync = RUN_SYNC.to_le_bytes();
    stream
        .windows(sync.len())
        .position(|w| w == sync)
        .map(|p| p + sync.len())
        .ok_or(FrameError::NoSyncFound {
            scanned: stream.len(),
        })
}

/// Parse the board header at `offset`.
///
/// `None` means the bytes there are not a usable header (wrong magic, wrong
/// header size, a payload that is not whole samples, or simply not enough
/// bytes left), which ends the usable data of the run.
pub fn parse_board_header(stream: &[u8], offset: usize) -> Option<RawFrameHeader> {
    if read_u32(stream, offset)? != BOARD_MAGIC {
        return None;
    }
    if read_u32(stream, offset + 4)? as usize * 4 != HEADER_LEN {
        return None;
    }
    let event_byte_length = read_u32(stream, offset + 8)? as usize;
    if event_byte_length == 0 || event_byte_length % SAMPLE_LEN != 0 {
        return None;
    }
    let firmware_version = read_u64(stream, offset + 12)?;
    let raw_board = i32::try_from(read_u32(stream, offset + 20)?).ok()?;
    let trigger_id = read_u32(stream, offset + 24)?;
    let timestamp = read_u16(stream, offset + 28)?;

    let variant = Variant::from_firmware(firmware_version);
    Some(RawFrameHeader {
        board_id: raw_board + variant.board_offset(),
        firmware_version,
        trigger_id,
        timestamp,
        event_byte_length,
        payload_offset: offset + HEADER_LEN,
    })
}

/// Read exactly `byte_length` bytes of samples starting at `offset`.
pub fn read_event_payload(
    stream: &[u8],
    offset: usize,
    byte_length: usize,
) -> Result<Vec<u32>, FrameError> {
    let truncated = || FrameError::TruncatedPayload {
        offset,
        expected: byte_length,
        available: stream.len().saturating_sub(offset),
    };
    let end = offset.checked_add(byte_length).ok_or_else(truncated)?;
    let bytes = stream.get(offset..end).ok_or_else(truncated)?;
    let samples = bytes
        .chunks_exact(SAMPLE_LEN)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(samples)
}

/// Walks a run board by board.
///
/// The scanner needs to know how many boards are read out per trigger, as
/// the gap after a board depends on whether it was the last one.
pub struct FrameScanner<'a> {
    stream: &'a [u8],
    offset: usize,
    boards: usize,
    boards_read: usize,
    done: bool,
}

impl<'a> FrameScanner<'a> {
    pub fn new(stream: &'a [u8], boards: usize) -> Result<Self, FrameError> {
        let offset = locate_run_start(stream)?;
        Ok(FrameScanner::starting_at(stream, offset, boards))
    }

    /// Scan from `offset`, the first board header of a trigger, e.g. as
    /// returned by [`locate_run_start`]
    pub fn starting_at(stream: &'a [u8], offset: usize, boards: usize) -> Self {
        FrameScanner {
            stream,
            offset,
            boards: boards.max(1),
            boards_read: 0,
            done: false,
        }
    }

    /// Current read position
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Group the frames into demultiplexed events, one per trigger
    pub fn events(self) -> Events<'a> {
        Events {
            frames: self,
            pending: None,
            error: None,
        }
    }
}

impl<'a> Iterator for FrameScanner<'a> {
    type Item = Result<Frame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let header = match parse_board_header(self.stream, self.offset) {
            Some(h) => h,
            None => {
                debug!(offset = self.offset, "no valid board header, end of data");
                self.done = true;
                return None;
            }
        };
        let samples = match read_event_payload(
            self.stream,
            header.payload_offset,
            header.event_byte_length,
        ) {
            Ok(s) => s,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        self.boards_read += 1;
        let last_of_trigger = self.boards_read == self.boards;
        if last_of_trigger {
            self.boards_read = 0;
        }
        self.offset = header.next_offset(last_of_trigger);

        Some(Ok(Frame {
            header,
            samples,
            last_of_trigger,
        }))
    }
}

/// Frames collected into triggers, with each board demultiplexed and split
/// into its two sides.
///
/// A board that cannot be demultiplexed spoils its whole trigger, which is
/// reported as an error; scanning then continues with the next trigger.
pub struct Events<'a> {
    frames: FrameScanner<'a>,
    pending: Option<Event>,
    error: Option<FrameError>,
}

impl<'a> Events<'a> {
    fn finish(&mut self) -> Option<Result<Event, FrameError>> {
        let event = self.pending.take();
        match self.error.take() {
            Some(e) => Some(Err(e)),
            None => event.map(Ok),
        }
    }
}

impl<'a> Iterator for Events<'a> {
    type Item = Result<Event, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.frames.next() {
                Some(Ok(frame)) => {
                    let header = frame.header;
                    let event = self.pending.get_or_insert_with(|| Event {
                        trigger_id: header.trigger_id,
                        timestamp: header.timestamp,
                        boards: BTreeMap::new(),
                    });
                    if event.trigger_id != header.trigger_id {
                        debug!(
                            expected = event.trigger_id,
                            found = header.trigger_id,
                            board = header.board_id,
                            "board trigger id differs within one trigger"
                        );
                    }
                    match demux::demux(&frame.samples, header.variant()) {
                        Ok(ordered) => {
                            event.boards.insert(
                                header.board_id,
                                BoardEvent {
                                    sides: demux::split_sides(ordered),
                                },
                            );
                        }
                        Err(source) => {
                            if self.error.is_none() {
                                self.error = Some(FrameError::Demux {
                                    board: header.board_id,
                                    trigger: header.trigger_id,
                                    source,
                                });
                            }
                        }
                    }
                    if frame.last_of_trigger {
                        return self.finish();
                    }
                }
                Some(Err(e)) => {
                    self.pending = None;
                    self.error = None;
                    return Some(Err(e));
                }
                // A trigger cut short by the end of the data is still handed out
                None => return self.finish(),
            }
        }
    }
}

/// Writes streams in the layout read by [`FrameScanner`]
#[derive(Default)]
pub struct StreamBuilder {
    bytes: Vec<u8>,
}

impl StreamBuilder {
    /// Start a run, with `junk` bytes ahead of the sync word
    pub fn new(junk: &[u8]) -> Self {
        let mut bytes = junk.to_vec();
        bytes.extend_from_slice(&RUN_SYNC.to_le_bytes());
        StreamBuilder { bytes }
    }

    /// Append one board block. `board` is the id as written by the firmware.
    pub fn board(
        &mut self,
        firmware_version: u64,
        board: u32,
        trigger_id: u32,
        timestamp: u16,
        samples: &[u32],
        last_of_trigger: bool,
    ) -> &mut Self {
        let b = &mut self.bytes;
        b.extend_from_slice(&BOARD_MAGIC.to_le_bytes());
        b.extend_from_slice(&((HEADER_LEN / 4) as u32).to_le_bytes());
        b.extend_from_slice(&((samples.len() * SAMPLE_LEN) as u32).to_le_bytes());
        b.extend_from_slice(&(firmware_version as u32).to_le_bytes());
        b.extend_from_slice(&((firmware_version >> 32) as u32).to_le_bytes());
        b.extend_from_slice(&board.to_le_bytes());
        b.extend_from_slice(&trigger_id.to_le_bytes());
        b.extend_from_slice(&timestamp.to_le_bytes());
        b.extend_from_slice(&[0, 0]);
        for s in samples {
            b.extend_from_slice(&s.to_le_bytes());
        }
        let padding = Variant::from_firmware(firmware_version).padding();
        let trailer = if last_of_trigger {
            TRIGGER_TRAILER
        } else {
            BOARD_TRAILER
        };
        b.resize(b.len() + padding + trailer, 0);
        self
    }

    /// Append raw bytes, e.g. a corrupted tail
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}
