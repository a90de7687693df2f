use anyhow::{bail, Context, Result};
use chrono::Local;
use std::env;
use std::fs;
use std::io::{BufWriter, Write};
use std::path;
use std::thread;
use striptools::{ser, ClusterRecord, Event};
use tracing::debug;

pub enum SaveMessage {
    /// Every board and side of one trigger
    Raw(Event),
    /// Accepted clusters of one event
    Clusters(Vec<ClusterRecord>),
}

type ClusterWriter = csv::Writer<BufWriter<fs::File>>;
type RawWriter = csv::Writer<zstd::stream::write::Encoder<'static, BufWriter<fs::File>>>;

/// Background writer for clusters and, optionally, raw events.
///
/// Files are created on the first message that needs them and closed when
/// the handle is finished.
pub struct SaveHandle {
    pub sender: flume::Sender<SaveMessage>,
    /// Output files are named `STEM.<kind>`
    pub stem: path::PathBuf,
    worker: thread::JoinHandle<Result<()>>,
}

impl SaveHandle {
    pub fn new(stem: Option<path::PathBuf>) -> Result<Self> {
        let stem = match stem {
            Some(p) => p,
            None => default_stem()?,
        };
        let (sender, receiver) = flume::unbounded();

        let out = stem.clone();
        let worker = thread::spawn(move || {
            let stem = out;
            let mut clusters: Option<ClusterWriter> = None;
            let mut raw: Option<RawWriter> = None;
            while let Ok(msg) = receiver.recv() {
                match msg {
                    SaveMessage::Clusters(records) => {
                        if clusters.is_none() {
                            clusters = Some(ser::tsv_writer(BufWriter::new(create(
                                &stem,
                                "clusters.tsv",
                            )?)));
                        }
                        if let Some(w) = clusters.as_mut() {
                            ser::clusters(w, &records).context("file io error")?;
                        }
                    }
                    SaveMessage::Raw(event) => {
                        if raw.is_none() {
                            let f = BufWriter::new(create(&stem, "raw.tsv.zst")?);
                            raw = Some(ser::tsv_writer(zstd::stream::write::Encoder::new(f, 0)?));
                        }
                        if let Some(w) = raw.as_mut() {
                            ser::event(w, &event).context("file io error")?;
                        }
                    }
                }
            }
            if let Some(mut w) = clusters {
                w.flush()?;
            }
            if let Some(w) = raw {
                let zwtr = w.into_inner().map_err(|e| e.into_error())?;
                zwtr.finish()?.flush()?;
            }
            debug!("save thread done");
            Ok(())
        });
        Ok(SaveHandle {
            sender,
            stem,
            worker,
        })
    }

    /// Close the channel and wait for everything to reach the disk
    pub fn finish(self) -> Result<()> {
        drop(self.sender);
        match self.worker.join() {
            Ok(r) => r,
            Err(_) => bail!("save thread panicked"),
        }
    }
}

fn default_stem() -> Result<path::PathBuf> {
    let mut path = env::current_dir()?;
    path.push(Local::now().format("%F-%H-%M-%S").to_string());
    Ok(path)
}

/// Path of one output file next to the stem
pub fn output_path(stem: &path::Path, extension: &str) -> path::PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    path::PathBuf::from(name)
}

fn create(stem: &path::Path, extension: &str) -> Result<fs::File> {
    let path = output_path(stem, extension);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    Ok(fs::File::create(path)?)
}
