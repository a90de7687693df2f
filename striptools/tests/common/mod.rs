#![allow(dead_code)]

use striptools::calib::{CalibrationTable, ChannelCalibration, Status};
use striptools::demux;
use striptools::Variant;

/// Zero pedestals, unit noise, every channel good
pub fn unit_calibration(n: usize) -> CalibrationTable {
    calibration(n, 0.0, 1.0)
}

pub fn calibration(n: usize, pedestal: f32, sigma: f32) -> CalibrationTable {
    CalibrationTable::load(vec![
        ChannelCalibration {
            pedestal,
            raw_sigma: sigma,
            sigma,
            status: Status::Good,
        };
        n
    ])
}

/// Raw board block whose physical channel `ch` reads `f(ch)`
pub fn block(variant: Variant, f: impl Fn(usize) -> u32) -> Vec<u32> {
    let ordered = (0..variant.block_len()).map(f).collect::<Vec<_>>();
    demux::remux(&ordered, variant).unwrap()
}

/// Calibration file text: 18 header lines, then one record per channel
pub fn calibration_text(channels: &[(f32, f32, f32, u8)]) -> String {
    let mut text = String::new();
    for i in 0..18 {
        text.push_str(&format!("# header line {}\n", i));
    }
    for (strip, &(pedestal, raw_sigma, sigma, status)) in channels.iter().enumerate() {
        text.push_str(&format!(
            "{}, {}, {}, {}, {}, {}, {}, 0\n",
            strip,
            strip / 64,
            strip % 64,
            pedestal,
            raw_sigma,
            sigma,
            status
        ));
    }
    text
}
