//! Samples waiting to be sent on, oldest first.
//!
//! On disk the queue is a json object keyed by position:
//! `{"0": {..}, "1": {..}}`. Keys only carry the order, they are thrown
//! away on read and regenerated on write.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::atomic;

pub const FILE_NAME: &str = "upload_queue.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// ppb
    pub tvoc: u16,
    /// ppm
    pub co2: u16,
    /// °C
    pub temperature: f32,
    /// % RH
    pub humidity: f32,
}

/// When the in memory queue is written to disk
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Persistence {
    /// Write the whole queue after each new sample
    #[default]
    EverySample,
    /// Only write on shutdown, samples are lost on power loss
    OnShutdown,
}

/// The in memory view of the queue
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SampleQueue(Vec<SampleRecord>);

impl SampleQueue {
    pub fn push(&mut self, sample: SampleRecord) {
        self.0.push(sample)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[SampleRecord] {
        &self.0
    }
}

impl From<Vec<SampleRecord>> for SampleQueue {
    fn from(samples: Vec<SampleRecord>) -> Self {
        Self(samples)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not read queue file at {}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Could not write queue file at {}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Queue file at {} is malformed", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Could not serialize queue")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A queue that was never written is empty
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<SampleRecord>, Error> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no queue on disk yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(Error::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let by_index: BTreeMap<u64, SampleRecord> =
            serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
                path: self.path.clone(),
                source,
            })?;
        debug!("read {} samples", by_index.len());
        Ok(by_index.into_values().collect())
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn write(&self, queue: &[SampleRecord]) -> Result<(), Error> {
        let by_index: BTreeMap<usize, &SampleRecord> = queue.iter().enumerate().collect();
        let bytes = serde_json::to_vec(&by_index).map_err(Error::Encode)?;
        atomic::replace(&self.path, &bytes).map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!("wrote {} samples", queue.len());
        Ok(())
    }
}
