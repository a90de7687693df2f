use striptools::calib::{CalibrationTable, Status};
use striptools::cn::{self, Algorithm, Estimate};
use striptools::VA_CHANNELS;

mod common;

/// A bad channel with a large reading does not pull the estimate
#[test]
fn bad_channel_excluded() {
    let mut chans = common::unit_calibration(VA_CHANNELS).channels().to_vec();
    chans[17].status = Status::Bad;
    let mut samples = vec![0.0; VA_CHANNELS];
    samples[17] = 500.0;
    for a in Algorithm::ALL {
        let e = cn::estimate_group(&samples, &chans, a);
        assert!(e.valid);
        assert!(e.value.abs() < 1e-6);
    }
}

#[test]
fn saturated_samples_excluded() {
    let chans = common::unit_calibration(VA_CHANNELS).channels().to_vec();
    let mut samples = vec![3.0; VA_CHANNELS];
    samples[0] = 5000.0;
    samples[1] = -4096.0;
    let e = cn::estimate_group(&samples, &chans, Algorithm::Mean);
    assert_eq!(Estimate { value: 3.0, valid: true }, e);
}

/// Each VA has its own offset; an all-bad VA has none
#[test]
fn groups_are_independent() {
    let mut chans = common::unit_calibration(3 * VA_CHANNELS).channels().to_vec();
    for c in chans[2 * VA_CHANNELS..].iter_mut() {
        c.status = Status::Bad;
    }
    let table = CalibrationTable::load(chans);
    let signal = (0..3 * VA_CHANNELS)
        .map(|i| (i / VA_CHANNELS) as f32 * 10.0 - 5.0)
        .collect::<Vec<_>>();

    let e0 = cn::estimate(&signal, 0, Algorithm::ClippedMean, &table);
    let e1 = cn::estimate(&signal, 1, Algorithm::ClippedMean, &table);
    let e2 = cn::estimate(&signal, 2, Algorithm::ClippedMean, &table);
    assert_eq!(-5.0, e0.value);
    assert_eq!(5.0, e1.value);
    assert_eq!(Estimate::INVALID, e2);
    assert!(!e2.usable(999.0));
}

#[test]
fn algorithm_from_config_tag() {
    let a: Algorithm = serde_json::from_str("2").unwrap();
    assert_eq!(Algorithm::ClippedMean, a);
    assert!(serde_json::from_str::<Algorithm>("7").is_err());
    assert_eq!("1", serde_json::to_string(&Algorithm::TrimmedMean).unwrap());
}
