use std::path::PathBuf;

use neurotest_core::TestVariant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no trials to run for {variant}")]
    EmptyTrialSet { variant: TestVariant },

    #[error("trial {id} belongs to {found}, runner was built for {expected}")]
    MixedTrialSet {
        id: usize,
        expected: TestVariant,
        found: TestVariant,
    },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("results document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("results sink rejected the run: {0}")]
    Rejected(String),
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.into(),
            source,
        }
    }
}
