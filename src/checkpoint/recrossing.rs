use super::{columns, ParamLayout, Record, RecordWriter, Schema};
use crate::error::Result;
use crate::units::{au_to_ps, ps_to_au, AU_TIME_FS};
use std::path::Path;
use tracing::warn;

pub const SCHEMA: Schema = Schema {
    title: "RPMD recrossing factor",
    fields: &[
        "Temperature",
        "Number of beads",
        "Reaction coordinate",
        "Time step",
        "Total number of child trajectories",
        "Initial parent equilibration time",
        "Frequency of child trajectory sampling",
        "Length of child trajectories",
        "Number of children per sampling",
    ],
    layout: ParamLayout::Block,
};

const WIDTHS: [usize; 6] = [9, 24, 24, 9, 11, 11];

/// Full contents of a recrossing-factor file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecrossingCheckpoint {
    pub temperature: f64,
    pub beads: usize,
    pub xi: f64,
    /// Atomic units.
    pub dt: f64,
    pub child_trajectories: usize,
    pub equilibration_steps: usize,
    pub sampling_steps: usize,
    pub evolution_steps: usize,
    pub children_per_sampling: usize,
    pub kappa_num: Vec<f64>,
    pub kappa_denom: f64,
    pub count: usize,
}

fn ratio(a: f64, b: f64) -> f64 {
    if b != 0.0 {
        a / b
    } else {
        0.0
    }
}

fn steps_text(steps: usize, dt_ps: f64) -> String {
    format!("{} ps ({steps} steps)", steps as f64 * dt_ps)
}

/// Rewrite the whole file from the current sums.
pub fn save(path: &Path, state: &RecrossingCheckpoint) -> Result<()> {
    let dt_ps = au_to_ps(state.dt);
    let mut w = RecordWriter::new(SCHEMA.title);
    w.param("Temperature", format!("{} K", state.temperature))
        .param("Number of beads", state.beads)
        .param("Reaction coordinate", state.xi)
        .param("Time step", format!("{dt_ps} ps"))
        .param("Total number of child trajectories", state.child_trajectories)
        .param(
            "Initial parent equilibration time",
            steps_text(state.equilibration_steps, dt_ps),
        )
        .param(
            "Frequency of child trajectory sampling",
            steps_text(state.sampling_steps, dt_ps),
        )
        .param(
            "Length of child trajectories",
            steps_text(state.evolution_steps, dt_ps),
        )
        .param("Number of children per sampling", state.children_per_sampling)
        .blank()
        .table_header(
            &WIDTHS,
            &[
                "Time (fs)",
                "kappa_num",
                "kappa_denom",
                "count",
                "kappa (old)",
                "kappa (new)",
            ],
        );
    for (n, num) in state.kappa_num.iter().enumerate() {
        w.line(format!(
            "{:>9.3} {:>24.16e} {:>24.16e} {:>9} {:>11.6} {:>11.6}",
            n as f64 * state.dt * AU_TIME_FS,
            num,
            state.kappa_denom,
            state.count,
            ratio(*num, state.count as f64),
            ratio(*num, state.kappa_denom),
        ));
    }
    w.rule(&WIDTHS);
    w.write_to(path)
}

fn parse_row(row: &str) -> Option<(f64, f64, usize)> {
    let [_, num, denom, n, _, _] = columns::<6>(row)?;
    Some((num.parse().ok()?, denom.parse().ok()?, n.parse().ok()?))
}

/// Read a recrossing file. A final row cut short by an interrupted run is
/// dropped, which leaves the series shorter than the stated child length.
pub fn load(path: &Path) -> Result<RecrossingCheckpoint> {
    let record = Record::read(path, &SCHEMA)?;
    let rows = record.table_rows();
    let mut kappa_num = Vec::with_capacity(rows.len());
    let mut kappa_denom = 0.0;
    let mut count = 0;
    for (i, row) in rows.iter().enumerate() {
        match parse_row(row) {
            Some((num, denom, n)) => {
                kappa_num.push(num);
                kappa_denom = denom;
                count = n;
            }
            None if i + 1 == rows.len() => {
                warn!("Ignoring incomplete final row in {}", path.display());
            }
            None => {
                return Err(record.format_error(format!("unreadable recrossing row {row:?}")))
            }
        }
    }

    let evolution_steps = record.steps("Length of child trajectories")?;
    if kappa_num.len() != evolution_steps {
        warn!(
            "{} holds {} of {evolution_steps} time steps",
            path.display(),
            kappa_num.len()
        );
    }

    Ok(RecrossingCheckpoint {
        temperature: record.number("Temperature")?,
        beads: record.integer("Number of beads")?,
        xi: record.number("Reaction coordinate")?,
        dt: ps_to_au(record.number("Time step")?),
        child_trajectories: record.integer("Total number of child trajectories")?,
        equilibration_steps: record.steps("Initial parent equilibration time")?,
        sampling_steps: record.steps("Frequency of child trajectory sampling")?,
        evolution_steps,
        children_per_sampling: record.integer("Number of children per sampling")?,
        kappa_num,
        kappa_denom,
        count,
    })
}
