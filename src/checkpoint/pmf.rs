use super::{columns, ParamLayout, Record, RecordWriter, Schema};
use crate::error::Result;
use crate::pmf::PotentialOfMeanForce;
use crate::units::HARTREE_EV;
use std::path::Path;

pub const SCHEMA: Schema = Schema {
    title: "RPMD potential of mean force",
    fields: &[
        "Temperature",
        "Lower bound of reaction coordinate",
        "Upper bound of reaction coordinate",
        "Number of bins",
    ],
    layout: ParamLayout::Block,
};

const WIDTHS: [usize; 2] = [24, 24];

/// Write the PMF table; free energies are stored in eV.
pub fn save(path: &Path, temperature: f64, pmf: &PotentialOfMeanForce) -> Result<()> {
    let mut w = RecordWriter::new(SCHEMA.title);
    w.param("Temperature", format!("{temperature} K"))
        .param("Lower bound of reaction coordinate", pmf.xi_min())
        .param("Upper bound of reaction coordinate", pmf.xi_max())
        .param("Number of bins", pmf.len())
        .blank()
        .table_header(&WIDTHS, &["Rxn coord", "PMF (eV)"]);
    for (xi, w_xi) in pmf.points() {
        w.line(format!("{:>24} {:>24.16e}", xi, w_xi * HARTREE_EV));
    }
    w.rule(&WIDTHS);
    w.write_to(path)
}

/// Read a PMF table back into atomic units, returning the temperature it
/// was computed at.
pub fn load(path: &Path) -> Result<(f64, PotentialOfMeanForce)> {
    let record = Record::read(path, &SCHEMA)?;
    let temperature = record.number("Temperature")?;
    let bins = record.integer("Number of bins")?;

    let rows = record.table_rows();
    if rows.len() != bins {
        return Err(record.format_error(format!(
            "expected {bins} PMF rows, found {}",
            rows.len()
        )));
    }
    let mut xi = Vec::with_capacity(bins);
    let mut free_energy = Vec::with_capacity(bins);
    for row in rows {
        let parsed = columns::<2>(row).and_then(|[x, a]| {
            Some((x.parse::<f64>().ok()?, a.parse::<f64>().ok()?))
        });
        let (x, a) = parsed.ok_or_else(|| record.format_error(format!("unreadable PMF row {row:?}")))?;
        xi.push(x);
        free_energy.push(a / HARTREE_EV);
    }
    let pmf = PotentialOfMeanForce::new(xi, free_energy)
        .map_err(|detail| record.format_error(detail))?;
    Ok((temperature, pmf))
}
