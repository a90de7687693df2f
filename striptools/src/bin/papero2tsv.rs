use argh::FromArgs;
use anyhow::{bail, Context, Result};
use either::{Left, Right};
use std::fs::{self, File};
use std::io::{stdout, BufWriter, Read, Write};

use striptools::frame::FrameScanner;
use striptools::ser;

const GIT_VERSION: &str = git_version::git_version!();

#[derive(Debug, FromArgs, Clone)]
/// Decode a binary readout run and print one tab-separated record per
/// board side and trigger: trigger, board, side, then the samples in
/// physical channel order. Scanning stops at the first block that is not
/// a valid board header.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// number of boards read out per trigger
    #[argh(option, short = 'b', default = "1")]
    pub boards: usize,
    /// compress the output with zstd
    #[argh(switch, short = 'z')]
    pub zstd: bool,
    /// file to write output to (writes to standard output by default)
    #[argh(option, short = 'o')]
    pub out: Option<String>,
    /// binary run file
    #[argh(positional)]
    pub input: String,
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
    if args.boards == 0 {
        bail!("at least one board must be read out");
    }

    let mut bytes = Vec::new();
    match fs::metadata(&args.input) {
        Ok(m) if m.is_file() => {
            File::open(&args.input)?.read_to_end(&mut bytes)?;
        }
        Ok(_) => bail!("{} is not a file", &args.input),
        Err(e) => bail!(e),
    }

    let stdout = stdout();
    let sink: Box<dyn Write> = match args.out {
        None => Box::new(stdout.lock()),
        Some(p) => Box::new(BufWriter::new(File::create(p)?)),
    };
    let sink = match args.zstd {
        true => Left(zstd::stream::write::Encoder::new(sink, 0)?.auto_finish()),
        false => Right(sink),
    };
    let mut wtr = ser::tsv_writer(sink);

    let scanner = FrameScanner::new(&bytes, args.boards)
        .with_context(|| format!("cannot start a run in {}", &args.input))?;
    let mut events = 0u64;
    let mut spoiled = 0u64;
    for result in scanner.events() {
        match result {
            Ok(ev) => {
                ser::event(&mut wtr, &ev)?;
                events += 1;
            }
            Err(e) => {
                eprintln!("skipping: {}", e);
                spoiled += 1;
            }
        }
    }
    wtr.flush()?;
    eprintln!("closing file after {} events ({} skipped)", events, spoiled);
    Ok(())
}
