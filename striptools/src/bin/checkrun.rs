//! `checkrun myrun.json`
//!
//! Parse and validate the run configuration `myrun.json`. No output and an
//! exit code of 0 indicates success.

use anyhow::{bail, Result};
use std::env;
use std::fs;
use striptools::cfg::Config;

fn main() -> Result<()> {
    let args = env::args().collect::<Vec<_>>();
    let path = match args.get(1) {
        Some(p) => p,
        None => bail!("usage: checkrun RUN.json"),
    };
    let text = fs::read_to_string(path)?;
    let config = Config::from_json(&text)?;
    config.validate()?;

    Ok(())
}
