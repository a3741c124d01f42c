use crate::error::{Result, RpmdError};
use crate::units::short;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of a job: shared artifacts in the output directory,
/// per-job artifacts in `<output>/<T>/<beads>/`.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    pub root: PathBuf,
    pub directory: PathBuf,
}

impl JobWorkspace {
    pub fn create(root: impl Into<PathBuf>, temperature: f64, beads: usize) -> Result<Self> {
        let root = root.into();
        let directory = root.join(short(temperature)).join(beads.to_string());
        fs::create_dir_all(&directory).map_err(|e| RpmdError::io(&directory, e))?;
        Ok(Self { root, directory })
    }

    /// Umbrella configurations do not depend on temperature or bead count.
    pub fn configurations_path(&self) -> PathBuf {
        self.root.join("umbrella_configurations.dat")
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}
