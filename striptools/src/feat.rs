//! Physics quantities derived from a cluster. None of these modify it.

use crate::calib::{CalibrationTable, Status};
use crate::{Cluster, SENTINEL, VA_CHANNELS};

/// Total signal of the cluster
pub fn signal_sum(c: &Cluster) -> f32 {
    c.samples.iter().sum()
}

/// Signal-weighted mean strip, or [`SENTINEL`] if the signal sums to zero
pub fn center_of_gravity(c: &Cluster) -> f32 {
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &s) in c.samples.iter().enumerate() {
        num += s * (c.address + i) as f32;
        den += s;
    }
    if den != 0.0 {
        num / den
    } else {
        SENTINEL
    }
}

/// Position of the center of gravity in mm for a sensor of the given pitch
pub fn position(c: &Cluster, pitch: f32) -> f32 {
    center_of_gravity(c) * pitch
}

/// Strip with the largest signal; the first one on ties
pub fn seed_index(c: &Cluster) -> usize {
    let mut best = 0;
    for (i, &s) in c.samples.iter().enumerate() {
        if s > c.samples[best] {
            best = i;
        }
    }
    c.address + best
}

pub fn seed_amplitude(c: &Cluster) -> f32 {
    c.samples.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// VA chip of the seed strip
pub fn va(c: &Cluster) -> usize {
    seed_index(c) / VA_CHANNELS
}

/// Charge sharing of a two-strip cluster, `s1 / (s0 + s1)`
pub fn eta(c: &Cluster) -> Option<f32> {
    match c.samples.as_slice() {
        &[a, b] => Some(b / (a + b)),
        _ => None,
    }
}

/// Asymmetry of a two-strip cluster, `(s0 - s1) / (s0 + s1)`
pub fn difference(c: &Cluster) -> Option<f32> {
    match c.samples.as_slice() {
        &[a, b] => Some((a - b) / (a + b)),
        _ => None,
    }
}

/// Cluster signal over the noise of its seed strip
pub fn signal_to_noise(c: &Cluster, calibration: &CalibrationTable) -> f32 {
    signal_sum(c) / calibration.sigma(seed_index(c))
}

/// Seed signal over the noise of the seed strip
pub fn seed_signal_to_noise(c: &Cluster, calibration: &CalibrationTable) -> f32 {
    seed_amplitude(c) / calibration.sigma(seed_index(c))
}

/// Cluster charge in units of a minimum ionizing particle, given the signal
/// a MIP leaves. Signal scales with the square of the charge.
pub fn charge(c: &Cluster, mip_adc: f32) -> f32 {
    (signal_sum(c).max(0.0) / mip_adc).sqrt()
}

pub fn seed_charge(c: &Cluster, mip_adc: f32) -> f32 {
    (seed_amplitude(c).max(0.0) / mip_adc).sqrt()
}

/// Default quality cut: the seed strip is good and its S/N passes `min_seed_sn`
pub fn good_cluster(c: &Cluster, calibration: &CalibrationTable, min_seed_sn: f32) -> bool {
    let seed = seed_index(c);
    if seed >= calibration.len() || calibration.status(seed) != Status::Good {
        return false;
    }
    seed_signal_to_noise(c, calibration) >= min_seed_sn
}

/// Whether the whole cluster lies in the strip window `[min, max]`.
/// Both ends are included, so with `max` on the last strip a cluster
/// touching the sensor edge is accepted.
pub fn in_strips(c: &Cluster, min: usize, max: usize) -> bool {
    c.address >= min && c.last() <= max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calib::ChannelCalibration;

    fn table(n: usize, sigma: f32) -> CalibrationTable {
        CalibrationTable::load(vec![
            ChannelCalibration {
                pedestal: 0.0,
                raw_sigma: sigma,
                sigma,
                status: Status::Good,
            };
            n
        ])
    }

    #[test]
    fn cog_and_seed() {
        let c = Cluster::new(100, vec![5.0, 8.0, 4.0], 3);
        assert_eq!(17.0, signal_sum(&c));
        let cog = (500.0 + 808.0 + 408.0) / 17.0;
        assert!((center_of_gravity(&c) - cog).abs() < 1e-4);
        assert!((position(&c, 0.15) - cog * 0.15).abs() < 1e-4);
        assert_eq!(101, seed_index(&c));
        assert_eq!(8.0, seed_amplitude(&c));
        assert_eq!(1, va(&c));
        assert_eq!(None, eta(&c));
    }

    #[test]
    fn cog_sentinel() {
        let c = Cluster::new(3, vec![0.0; 4], 0);
        assert_eq!(SENTINEL, center_of_gravity(&c));
        // Cancelling signals also leave nothing to weigh
        let c = Cluster::new(3, vec![2.0, -2.0], 0);
        assert_eq!(SENTINEL, center_of_gravity(&c));
    }

    #[test]
    fn two_strip_quantities() {
        let c = Cluster::new(10, vec![30.0, 10.0], 1);
        assert_eq!(Some(0.25), eta(&c));
        assert_eq!(Some(0.5), difference(&c));
        assert_eq!(10, seed_index(&c));
    }

    #[test]
    fn noise_and_charge() {
        let t = table(20, 2.0);
        let c = Cluster::new(10, vec![30.0, 10.0], 1);
        assert_eq!(20.0, signal_to_noise(&c, &t));
        assert_eq!(15.0, seed_signal_to_noise(&c, &t));
        assert_eq!(2.0, charge(&c, 10.0));
        assert_eq!(1.0, seed_charge(&Cluster::new(0, vec![10.0], 1), 10.0));
        assert!(good_cluster(&c, &t, 15.0));
        assert!(!good_cluster(&c, &t, 15.5));
    }

    #[test]
    fn bad_seed_is_not_good() {
        let mut chans = table(4, 1.0).channels().to_vec();
        chans[2].status = Status::Bad;
        let t = CalibrationTable::load(chans);
        assert!(!good_cluster(&Cluster::new(1, vec![1.0, 50.0], 1), &t, 3.0));
        assert!(good_cluster(&Cluster::new(0, vec![50.0, 1.0], 1), &t, 3.0));
        // Seed beyond the calibration
        assert!(!good_cluster(&Cluster::new(4, vec![50.0], 1), &t, 3.0));
    }

    #[test]
    fn strip_window() {
        let c = Cluster::new(10, vec![1.0; 3], 0);
        assert!(in_strips(&c, 10, 12));
        assert!(!in_strips(&c, 11, 20));
        assert!(!in_strips(&c, 0, 11));
    }

    #[test]
    fn strip_window_includes_last_strip() {
        let edge = Cluster::new(381, vec![1.0; 3], 0);
        assert!(in_strips(&edge, 0, 383));
        assert!(!in_strips(&edge, 0, 382));
        let first = Cluster::new(0, vec![1.0; 2], 0);
        assert!(in_strips(&first, 0, 383));
    }
}
