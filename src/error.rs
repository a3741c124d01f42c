use md::PropagatorError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure modes of an RPMD job.
#[derive(Debug, Error)]
pub enum RpmdError {
    /// A stage was invoked before the stage it depends on produced output.
    #[error("{stage} requires {missing} to be computed first")]
    Precondition {
        stage: &'static str,
        missing: &'static str,
    },
    /// A checkpoint file exists but cannot be trusted.
    #[error("{path}: {detail}")]
    CheckpointFormat { path: PathBuf, detail: String },
    #[error("inconsistent indices in equivalent transition state: {atom} mapped to both {first} and {second}")]
    InconsistentMapping {
        atom: usize,
        first: usize,
        second: usize,
    },
    /// Parallel execution was requested explicitly but is not available.
    #[error("parallel execution unavailable: {detail}")]
    DependencyUnavailable { detail: String },
    #[error("trajectory failed: {0}")]
    Propagator(#[from] PropagatorError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RpmdError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        RpmdError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn format(path: &Path, detail: impl Into<String>) -> Self {
        RpmdError::CheckpointFormat {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RpmdError>;
