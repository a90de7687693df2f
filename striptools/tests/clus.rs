use striptools::calib::{CalibrationTable, Status};
use striptools::clus::{clusterize, Mode, Params};
use striptools::feat;

mod common;

fn hit() -> Vec<f32> {
    let mut s = vec![0.0; 384];
    s[100] = 5.0;
    s[101] = 8.0;
    s[102] = 4.0;
    s
}

#[test]
fn double_threshold_hit() {
    let cal = common::unit_calibration(384);
    let p = Params {
        high: 3.5,
        low: 1.0,
        mode: Mode::DoubleThreshold,
        ..Default::default()
    };
    let c = clusterize(&cal, &hit(), &p).unwrap();
    assert_eq!(1, c.seeds);
    assert_eq!(1, c.clusters.len());
    let cl = &c.clusters[0];
    assert_eq!(100, cl.address);
    assert_eq!(3, cl.width);
    assert_eq!(17.0, feat::signal_sum(cl));
    assert_eq!(3, cl.over);
    assert_eq!(101, feat::seed_index(cl));
    assert_eq!(1, feat::va(cl));
}

#[test]
fn symmetric_hit() {
    let cal = common::unit_calibration(384);
    // Only strip 101 passes the high threshold
    let p = Params {
        high: 6.0,
        low: 1.0,
        mode: Mode::Symmetric,
        window: 1,
        ..Default::default()
    };
    let c = clusterize(&cal, &hit(), &p).unwrap();
    assert_eq!(1, c.clusters.len());
    let cl = &c.clusters[0];
    assert_eq!(100, cl.address);
    assert_eq!(3, cl.width);
    assert_eq!(vec![5.0, 8.0, 4.0], cl.samples);
    assert_eq!(1, cl.over);
}

#[test]
fn absolute_thresholds_ignore_sigma() {
    let cal = common::calibration(384, 0.0, 4.0);
    let sn = clusterize(&cal, &hit(), &Params::default()).unwrap();
    assert!(sn.clusters.is_empty());

    let p = Params {
        high: 3.5,
        low: 1.0,
        absolute: true,
        ..Default::default()
    };
    let abs = clusterize(&cal, &hit(), &p).unwrap();
    assert_eq!(1, abs.clusters.len());
    assert_eq!(3, abs.clusters[0].width);
}

#[test]
fn quality_and_strip_window() {
    let cal = common::unit_calibration(384);
    let c = clusterize(&cal, &hit(), &Params::default()).unwrap();
    let cl = &c.clusters[0];
    assert!(feat::good_cluster(cl, &cal, 3.5));
    assert!(!feat::good_cluster(cl, &cal, 8.5));
    assert!(feat::in_strips(cl, 100, 102));
    assert!(!feat::in_strips(cl, 101, 383));
    assert!(!feat::in_strips(cl, 0, 101));

    let mut chans = cal.channels().to_vec();
    chans[101].status = Status::Bad;
    let bad_seed = CalibrationTable::load(chans);
    assert!(!feat::good_cluster(cl, &bad_seed, 3.5));
}

#[test]
fn two_hits_in_order() {
    let cal = common::unit_calibration(384);
    let mut s = hit();
    s[300] = 12.0;
    s[301] = 2.0;
    let c = clusterize(&cal, &s, &Params::default()).unwrap();
    let addrs = c
        .clusters
        .iter()
        .map(|c| (c.address, c.width))
        .collect::<Vec<_>>();
    assert_eq!(vec![(100, 3), (300, 2)], addrs);
    let two = &c.clusters[1];
    assert_eq!(Some(2.0 / 14.0), feat::eta(two));
    assert_eq!(Some(10.0 / 14.0), feat::difference(two));
}
