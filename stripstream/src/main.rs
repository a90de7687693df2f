use anyhow::{bail, Context, Result};
use chrono::Local;
use parking_lot::RwLock;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use stripstream::save::{self, SaveHandle};
use stripstream::{processor, reader, CliArgs};
use striptools::cfg::Config;
use striptools::clus::Mode;
use striptools::cn::Algorithm;
use striptools::de;
use tracing::info;

const GIT_VERSION: &str = git_version::git_version!();

/// Triggers buffered between the scanner and the processor
const SCAN_QUEUE: usize = 64;

fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();

    if args.version {
        let stdout = std::io::stdout();
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

    tracing_subscriber::fmt::init();

    let config = load_config(&args)?;
    config.validate()?;

    let calibration = match &args.calibration {
        Some(p) => de::calibration(BufReader::new(File::open(p)?))
            .with_context(|| format!("cannot read calibration {}", p))?,
        None => bail!("a calibration file is required (--calibration)"),
    };
    calibration.check_len(config.channel_count)?;

    let input = match &args.input {
        Some(p) => p,
        None => bail!("no input file given"),
    };
    let bytes = fs::read(input).with_context(|| format!("cannot read {}", input))?;
    info!(bytes = bytes.len(), file = %input, "input loaded");

    let saver = SaveHandle::new(args.output.clone().map(PathBuf::from))?;
    let record_path = save::output_path(&saver.stem, "run.json");

    let (sender, receiver) = flume::bounded(SCAN_QUEUE);
    reader::main(bytes, config.boards, sender)
        .with_context(|| format!("cannot start a run in {}", input))?;

    let shared = Arc::new(RwLock::new(Arc::new(calibration)));
    let result = processor::run(&config, shared, receiver, &saver.sender, args.save_raw);
    saver.finish()?;
    let mut record = result?;

    record.timestamp = Some(Local::now());
    if record_path.exists() {
        bail!("{} already exists", record_path.display());
    }
    let mut f = File::create(&record_path)?;
    writeln!(f, "{}", serde_json::to_string_pretty(&record)?)?;
    info!(file = %record_path.display(), "run record written");
    Ok(())
}

/// Configuration file, if any, with the command line flags on top
fn load_config(args: &CliArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(p) => {
            let text = fs::read_to_string(p)?;
            Config::from_json(&text).with_context(|| format!("cannot parse config {}", p))?
        }
        None => Config::default(),
    };
    if let Some(n) = args.nevents {
        config.nevents = Some(n);
    }
    if let Some(b) = args.boards {
        config.boards = b;
    }
    if let Some(b) = args.board {
        config.board = b;
    }
    if let Some(s) = args.side {
        config.side = s;
    }
    if let Some(t) = args.highthreshold {
        config.high_threshold = t;
    }
    if let Some(t) = args.lowthreshold {
        config.low_threshold = t;
    }
    if args.symmetric {
        config.cluster_mode = Mode::Symmetric;
    }
    if let Some(w) = args.symmetricwidth {
        config.window_width = w;
    }
    if args.absolute {
        config.absolute_threshold = true;
    }
    if let Some(a) = args.cn {
        config.common_noise_algorithm = Algorithm::try_from(a)?;
    }
    if let Some(m) = args.maxcn {
        config.max_common_noise = m;
    }
    if let Some(s) = args.minstrip {
        config.min_strip = s;
    }
    if let Some(s) = args.maxstrip {
        config.max_strip = s;
    }
    if args.invert {
        config.invert_polarity = true;
    }
    if args.dynped {
        config.dynamic_pedestal = true;
    }
    Ok(config)
}
