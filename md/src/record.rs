// file: `md/src/record.rs`
use crate::propagator::{BeadArray, PropagatorError};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const BOHR_TO_ANGSTROM: f64 = 0.52917721092;

/// Appends XYZ frames containing every bead of every atom (in angstroms).
pub struct XyzRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl XyzRecorder {
    pub fn open(path: &Path) -> Result<Self, PropagatorError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| PropagatorError::Record {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn write_frame(
        &mut self,
        labels: &[String],
        q: &BeadArray,
        comment: &str,
    ) -> Result<(), PropagatorError> {
        let total: usize = q.iter().map(|beads| beads.len()).sum();
        let mut frame = format!("{total}\n{comment}\n");
        for (j, beads) in q.iter().enumerate() {
            let label = labels.get(j).map(String::as_str).unwrap_or("X");
            for r in beads {
                let r = r * BOHR_TO_ANGSTROM;
                frame.push_str(&format!(
                    "{:<5} {:12.6} {:12.6} {:12.6}\n",
                    label, r.x, r.y, r.z
                ));
            }
        }
        self.writer
            .write_all(frame.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|source| PropagatorError::Record {
                path: self.path.clone(),
                source,
            })
    }
}
