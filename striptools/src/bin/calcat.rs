use argh::FromArgs;
use anyhow::{bail, Result};
use std::fs::{self, File};
use std::io::{stdout, BufReader, Write};

use striptools::{de, ser};

const GIT_VERSION: &str = git_version::git_version!();

#[derive(Debug, FromArgs, Clone)]
/// Read calibration files and print their channels as tab-separated
/// values: strip, pedestal, raw sigma, sigma and status (0 for good
/// channels).
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// lines of free text before the channel records
    #[argh(option, default = "de::CALIBRATION_HEADER_LINES")]
    pub header: usize,
    /// calibration files
    #[argh(positional)]
    pub input: Vec<String>,
}

fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();
    if args.version {
        let stdout = stdout();
        let mut stdout = stdout.lock();
        writeln!(
            stdout,
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        )?;
        return Ok(())
    }

    let stdout = stdout();
    let stdout = stdout.lock();
    let mut wtr = ser::tsv_writer(stdout);

    for i in args.input {
        match fs::metadata(&i) {
            Ok(m) if m.is_file() => {}
            Ok(_) => bail!("{} is not a file", &i),
            Err(e) => bail!(e),
        }
        let rdr = BufReader::new(File::open(&i)?);
        let table = de::calibration_skip(rdr, args.header)?;
        ser::calibration(&mut wtr, &table)?;
    }
    wtr.flush()?;
    Ok(())
}
