pub mod data;
pub mod processor;
pub mod reader;
pub mod save;

use argh::FromArgs;
#[derive(Debug, FromArgs, Clone)]
/// Decode a binary readout run, correct pedestals and common-mode noise,
/// and write the clusters found on one side of one board
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// run configuration (JSON)
    #[argh(option, short = 'c')]
    pub config: Option<String>,
    /// calibration file
    #[argh(option)]
    pub calibration: Option<String>,
    /// output file stem; clusters go to STEM.clusters.tsv
    #[argh(option, short = 'o')]
    pub output: Option<String>,
    /// also save the raw events of every board to STEM.raw.tsv.zst
    #[argh(switch)]
    pub save_raw: bool,
    /// number of events to process
    #[argh(option)]
    pub nevents: Option<u64>,
    /// boards read out per trigger
    #[argh(option)]
    pub boards: Option<usize>,
    /// board to analyze
    #[argh(option)]
    pub board: Option<i32>,
    /// sensor side to analyze (0, 1)
    #[argh(option)]
    pub side: Option<usize>,
    /// high threshold used in the clusterization
    #[argh(option)]
    pub highthreshold: Option<f32>,
    /// low threshold used in the clusterization
    #[argh(option)]
    pub lowthreshold: Option<f32>,
    /// use symmetric clusters instead of double threshold
    #[argh(switch, short = 's')]
    pub symmetric: bool,
    /// half width of symmetric clusters
    #[argh(option)]
    pub symmetricwidth: Option<usize>,
    /// use absolute ADC values instead of S/N for thresholds
    #[argh(switch, short = 'a')]
    pub absolute: bool,
    /// common noise algorithm (0, 1, 2)
    #[argh(option)]
    pub cn: Option<u8>,
    /// largest common noise of a good event
    #[argh(option)]
    pub maxcn: Option<f32>,
    /// first strip to analyze
    #[argh(option)]
    pub minstrip: Option<usize>,
    /// last strip to analyze
    #[argh(option)]
    pub maxstrip: Option<usize>,
    /// search for negative signal peaks
    #[argh(switch)]
    pub invert: bool,
    /// enable dynamic pedestals
    #[argh(switch)]
    pub dynped: bool,
    /// binary run file
    #[argh(positional)]
    pub input: Option<String>,
}
