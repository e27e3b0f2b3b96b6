use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use neurotest_core::{RunResult, TestVariant};
use tracing::info;

use crate::SinkError;

/// Where finished runs go. Failures are reported to the caller and never retried.
pub trait ResultsSink {
    fn submit(&mut self, run: &RunResult) -> Result<(), SinkError>;

    fn describe(&self) -> String;
}

/// Writes one pretty-printed JSON document per run.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, run: &RunResult) -> PathBuf {
        let test = run
            .variant()
            .map(TestVariant::slug)
            .unwrap_or("unknown-test");
        let stamp = run.completed_at.format("%Y%m%dT%H%M%S%3fZ");
        self.dir
            .join(format!("{}_{}_{}.json", file_safe(&run.subject_id), test, stamp))
    }
}

impl ResultsSink for JsonFileSink {
    fn submit(&mut self, run: &RunResult) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir).map_err(|e| SinkError::io(&self.dir, e))?;
        let path = self.path_for(run);
        let file = File::create(&path).map_err(|e| SinkError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, run)?;
        writer.flush().map_err(|e| SinkError::io(&path, e))?;
        info!(path = %path.display(), records = run.records.len(), "results saved");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json files in {}", self.dir.display())
    }
}

/// Reads back a document written by [`JsonFileSink`].
pub fn read_run(path: &Path) -> Result<RunResult, SinkError> {
    let file = File::open(path).map_err(|e| SinkError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn file_safe(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

/// Keeps runs in memory; clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    runs: Arc<Mutex<Vec<RunResult>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<RunResult> {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultsSink for MemorySink {
    fn submit(&mut self, run: &RunResult) -> Result<(), SinkError> {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(run.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
