use super::{columns, ParamLayout, Record, RecordWriter, Schema};
use crate::error::{Result, RpmdError};
use crate::units::{au_to_ps, ps_to_au};
use crate::window::Window;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::warn;

pub const SCHEMA: Schema = Schema {
    title: "RPMD umbrella sampling",
    fields: &[
        "Temperature",
        "Number of beads",
        "Time step",
        "Reaction coordinate",
        "Equilibration time",
        "Trajectory evolution time",
        "Force constant",
    ],
    layout: ParamLayout::Block,
};

const WIDTHS: [usize; 5] = [23, 23, 11, 15, 15];

/// Parameter block of a per-window sampling file.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingHeader {
    pub temperature: f64,
    pub beads: usize,
    /// Atomic units.
    pub dt: f64,
    pub xi: f64,
    pub equilibration_steps: usize,
    pub evolution_steps: usize,
    pub kforce: f64,
}

/// Running sums recorded after one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingRow {
    pub av: f64,
    pub av2: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingCheckpoint {
    pub header: SamplingHeader,
    /// Most recent complete row, if any batch finished.
    pub last: Option<SamplingRow>,
}

/// Start a new sampling file holding only the header and an empty table.
pub fn create(path: &Path, header: &SamplingHeader) -> Result<()> {
    let dt_ps = au_to_ps(header.dt);
    let mut w = RecordWriter::new(SCHEMA.title);
    w.param("Temperature", format!("{} K", header.temperature))
        .param("Number of beads", header.beads)
        .param("Time step", format!("{dt_ps} ps"))
        .param("Reaction coordinate", header.xi)
        .param(
            "Equilibration time",
            format!(
                "{} ps ({} steps)",
                header.equilibration_steps as f64 * dt_ps,
                header.equilibration_steps
            ),
        )
        .param(
            "Trajectory evolution time",
            format!(
                "{} ps ({} steps)",
                header.evolution_steps as f64 * dt_ps,
                header.evolution_steps
            ),
        )
        .param("Force constant", header.kforce)
        .blank()
        .table_header(
            &WIDTHS,
            &["total av", "total av2", "count", "xi_mean", "xi_var"],
        );
    w.write_to(path)
}

/// Append the window's current running sums as one table row.
pub fn append_row(path: &Path, window: &Window) -> Result<()> {
    let mean = window.mean().unwrap_or(0.0);
    let variance = window.variance().unwrap_or(0.0);
    let row = format!(
        "{:>23.16e} {:>23.16e} {:>11} {:>15.8} {:>15.5e}\n",
        window.av, window.av2, window.count, mean, variance
    );
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| RpmdError::io(path, e))?;
    file.write_all(row.as_bytes())
        .map_err(|e| RpmdError::io(path, e))
}

fn parse_row(row: &str) -> Option<SamplingRow> {
    let [av, av2, count, _, _] = columns::<5>(row)?;
    Some(SamplingRow {
        av: av.parse().ok()?,
        av2: av2.parse().ok()?,
        count: count.parse().ok()?,
    })
}

/// Read a sampling file. A final row cut short by an interrupted write is
/// skipped; any other unreadable row fails the load.
pub fn load(path: &Path) -> Result<SamplingCheckpoint> {
    let record = Record::read(path, &SCHEMA)?;
    let header = SamplingHeader {
        temperature: record.number("Temperature")?,
        beads: record.integer("Number of beads")?,
        dt: ps_to_au(record.number("Time step")?),
        xi: record.number("Reaction coordinate")?,
        equilibration_steps: record.steps("Equilibration time")?,
        evolution_steps: record.steps("Trajectory evolution time")?,
        kforce: record.number("Force constant")?,
    };

    let rows = record.table_rows();
    let mut last = None;
    for (i, row) in rows.iter().enumerate() {
        match parse_row(row) {
            Some(parsed) => last = Some(parsed),
            None if i + 1 == rows.len() => {
                warn!("Ignoring incomplete final row in {}", path.display());
            }
            None => return Err(record.format_error(format!("unreadable sampling row {row:?}"))),
        }
    }
    Ok(SamplingCheckpoint { header, last })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn header() -> SamplingHeader {
        SamplingHeader {
            temperature: 300.0,
            beads: 4,
            dt: ps_to_au(0.0001),
            xi: 1.05,
            equilibration_steps: 200,
            evolution_steps: 1000,
            kforce: 0.1,
        }
    }

    #[test]
    fn rows_resume_with_exact_sums() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("umbrella_sampling_1.05.dat");
        create(&path, &header()).unwrap();
        assert_eq!(load(&path).unwrap().last, None);

        let mut window = Window::new(1.05, 0.1, 3, 1.0, 1.0);
        window.av = 1.0 / 3.0;
        window.av2 = 2.0f64.sqrt();
        window.count = 1000;
        append_row(&path, &window).unwrap();
        window.av += 0.1;
        window.count += 1000;
        append_row(&path, &window).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.header.xi, 1.05);
        assert_eq!(loaded.header.evolution_steps, 1000);
        assert_eq!(
            loaded.last,
            Some(SamplingRow {
                av: window.av,
                av2: window.av2,
                count: 2000
            })
        );
    }

    #[test]
    fn truncated_final_row_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.dat");
        create(&path, &header()).unwrap();
        let mut window = Window::new(1.05, 0.1, 3, 1.0, 1.0);
        window.av = 5.0;
        window.av2 = 26.0;
        window.count = 5;
        append_row(&path, &window).unwrap();
        let mut text = fs::read_to_string(&path).unwrap();
        text.push_str("  1.0000000000000000e1  2.0");
        fs::write(&path, text).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.last.map(|r| r.count), Some(5));
    }
}
