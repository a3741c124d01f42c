use super::{ParamLayout, Record, RecordWriter, Schema};
use crate::error::Result;
use crate::units::{rate_from_cm3_per_molecule_s, rate_to_cm3_per_molecule_s, AVOGADRO};
use std::path::Path;

pub const SCHEMA: Schema = Schema {
    title: "RPMD rate coefficient",
    fields: &[
        "Temperature",
        "Number of beads",
        "k_QTST(T;s0)",
        "Static factor",
        "Maximum reaction coordinate (xi_max)",
        "k_QTST(T;xi_max)",
        "Recrossing factor",
        "k_RPMD(T)",
    ],
    layout: ParamLayout::ToEnd,
};

/// Final rate record; rates are held in atomic units.
#[derive(Debug, Clone, PartialEq)]
pub struct RateCoefficient {
    pub temperature: f64,
    pub beads: usize,
    pub k_qtst_s0: f64,
    pub static_factor: f64,
    pub xi_max: f64,
    pub k_qtst: f64,
    pub recrossing_factor: f64,
    pub k_rpmd: f64,
}

impl RateCoefficient {
    pub fn k_rpmd_cm3_per_mol_s(&self) -> f64 {
        rate_to_cm3_per_molecule_s(self.k_rpmd) * AVOGADRO
    }
}

fn rate_param(w: &mut RecordWriter, name: &str, rate: f64) {
    let per_molecule = rate_to_cm3_per_molecule_s(rate);
    w.param(name, format!("{per_molecule:e} cm^3/(molecule*s)"))
        .continuation(format!("{:e} cm^3/(mol*s)", per_molecule * AVOGADRO))
        .blank();
}

pub fn save(path: &Path, rate: &RateCoefficient) -> Result<()> {
    let mut w = RecordWriter::new(SCHEMA.title);
    w.param("Temperature", format!("{} K", rate.temperature))
        .param("Number of beads", rate.beads)
        .blank();
    rate_param(&mut w, "k_QTST(T;s0)", rate.k_qtst_s0);
    w.param("Static factor", format!("{:e}", rate.static_factor))
        .blank()
        .param("Maximum reaction coordinate (xi_max)", rate.xi_max)
        .blank();
    rate_param(&mut w, "k_QTST(T;xi_max)", rate.k_qtst);
    w.param("Recrossing factor", format!("{:e}", rate.recrossing_factor))
        .blank();
    rate_param(&mut w, "k_RPMD(T)", rate.k_rpmd);
    w.write_to(path)
}

pub fn load(path: &Path) -> Result<RateCoefficient> {
    let record = Record::read(path, &SCHEMA)?;
    let rate = |name: &str| -> Result<f64> {
        Ok(rate_from_cm3_per_molecule_s(record.number(name)?))
    };
    Ok(RateCoefficient {
        temperature: record.number("Temperature")?,
        beads: record.integer("Number of beads")?,
        k_qtst_s0: rate("k_QTST(T;s0)")?,
        static_factor: record.number("Static factor")?,
        xi_max: record.number("Maximum reaction coordinate (xi_max)")?,
        k_qtst: rate("k_QTST(T;xi_max)")?,
        recrossing_factor: record.number("Recrossing factor")?,
        k_rpmd: rate("k_RPMD(T)")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpmdError;
    use approx::assert_relative_eq;
    use std::fs;

    fn record() -> RateCoefficient {
        RateCoefficient {
            temperature: 1000.0,
            beads: 16,
            k_qtst_s0: 2.5e-3,
            static_factor: 3.1e-5,
            xi_max: 1.0125,
            k_qtst: 2.5e-3 * 3.1e-5,
            recrossing_factor: 0.42,
            k_rpmd: 2.5e-3 * 3.1e-5 * 0.42,
        }
    }

    #[test]
    fn record_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rate_coefficient_16.dat");
        save(&path, &record()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("cm^3/(mol*s)"));

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.beads, 16);
        assert_eq!(loaded.xi_max, 1.0125);
        assert_relative_eq!(loaded.k_rpmd, record().k_rpmd, max_relative = 1e-12);
        assert_relative_eq!(loaded.static_factor, 3.1e-5);
    }

    #[test]
    fn other_record_kind_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rate.dat");
        fs::write(&path, "*****\nRPMD recrossing factor\n*****\n\n").unwrap();
        assert!(matches!(load(&path), Err(RpmdError::CheckpointFormat { .. })));
    }
}
