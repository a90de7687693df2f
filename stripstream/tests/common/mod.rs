#![allow(dead_code)]

use parking_lot::RwLock;
use std::sync::Arc;
use stripstream::processor::SharedCalibration;
use striptools::calib::{CalibrationTable, ChannelCalibration, Status};
use striptools::frame::StreamBuilder;
use striptools::{demux, Variant};

pub const FW: u64 = 0x0000_0001_2020_0101;
pub const PEDESTAL: u32 = 300;

pub fn calibration(n: usize) -> CalibrationTable {
    CalibrationTable::load(vec![
        ChannelCalibration {
            pedestal: PEDESTAL as f32,
            raw_sigma: 2.0,
            sigma: 2.0,
            status: Status::Good,
        };
        n
    ])
}

pub fn shared(table: CalibrationTable) -> SharedCalibration {
    Arc::new(RwLock::new(Arc::new(table)))
}

/// Raw standard block whose physical channel `ch` reads `f(ch)`
pub fn block(f: impl Fn(usize) -> u32) -> Vec<u32> {
    let ordered = (0..Variant::Standard.block_len()).map(f).collect::<Vec<_>>();
    demux::remux(&ordered, Variant::Standard).unwrap()
}

/// One single-board trigger per block, trigger ids counting from 1
pub fn run(blocks: &[Vec<u32>]) -> Vec<u8> {
    let mut builder = StreamBuilder::new(&[0xaa; 7]);
    for (t, b) in blocks.iter().enumerate() {
        builder.board(FW, 0, t as u32 + 1, 0, b, true);
    }
    builder.finish()
}

pub fn flat() -> Vec<u32> {
    block(|_| PEDESTAL)
}

/// A three-strip hit on side 0 at strips 100..=102
pub fn hit() -> Vec<u32> {
    block(|ch| match ch {
        100 => PEDESTAL + 50,
        101 => PEDESTAL + 80,
        102 => PEDESTAL + 40,
        _ => PEDESTAL,
    })
}
