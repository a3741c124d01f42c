use super::{ParamLayout, Record, RecordWriter, Schema};
use crate::configuration::UmbrellaConfiguration;
use crate::error::Result;
use crate::units::au_to_ps;
use nalgebra::Vector3;
use std::path::Path;

pub const SCHEMA: Schema = Schema {
    title: "RPMD umbrella configurations",
    fields: &[
        "Temperature",
        "Number of beads",
        "Time step",
        "Number of umbrella integration windows",
        "Trajectory evolution time",
    ],
    layout: ParamLayout::Block,
};

/// Generation parameters written alongside the configurations.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationInfo {
    pub temperature: f64,
    /// Atomic units.
    pub dt: f64,
    pub evolution_steps: usize,
}

pub fn save(
    path: &Path,
    info: &GenerationInfo,
    labels: &[String],
    configurations: &[UmbrellaConfiguration],
) -> Result<()> {
    let dt_ps = au_to_ps(info.dt);
    let mut w = RecordWriter::new(SCHEMA.title);
    w.param("Temperature", format!("{} K", info.temperature))
        .param("Number of beads", 1)
        .param("Time step", format!("{dt_ps} ps"))
        .param("Number of umbrella integration windows", configurations.len())
        .param(
            "Trajectory evolution time",
            format!(
                "{} ps ({} steps)",
                info.evolution_steps as f64 * dt_ps,
                info.evolution_steps
            ),
        )
        .blank();
    for configuration in configurations {
        w.line(format!("xi = {}", configuration.xi));
        for (label, r) in labels.iter().zip(&configuration.geometry) {
            w.line(format!(
                "{label:<5} {:>24.16e} {:>24.16e} {:>24.16e}",
                r.x, r.y, r.z
            ));
        }
        w.blank();
    }
    w.write_to(path)
}

/// Load every configuration; geometries are in bohr.
pub fn load(path: &Path) -> Result<Vec<UmbrellaConfiguration>> {
    let record = Record::read(path, &SCHEMA)?;
    let expected = record.integer("Number of umbrella integration windows")?;

    let mut configurations: Vec<UmbrellaConfiguration> = Vec::with_capacity(expected);
    for line in record.body().iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if let Some(value) = line.strip_prefix("xi =") {
            let xi = value
                .trim()
                .parse()
                .map_err(|_| record.format_error(format!("unreadable line {line:?}")))?;
            configurations.push(UmbrellaConfiguration {
                xi,
                geometry: Vec::new(),
            });
            continue;
        }
        let cells: Vec<&str> = line.split_whitespace().collect();
        let coords: Option<Vec<f64>> = match cells.as_slice() {
            [_, x, y, z] => [x, y, z].iter().map(|c| c.parse().ok()).collect(),
            _ => None,
        };
        let current = configurations.last_mut();
        match (coords, current) {
            (Some(c), Some(configuration)) => {
                configuration.geometry.push(Vector3::new(c[0], c[1], c[2]))
            }
            _ => return Err(record.format_error(format!("unreadable line {line:?}"))),
        }
    }

    if configurations.len() != expected {
        return Err(record.format_error(format!(
            "expected {expected} configurations, found {}",
            configurations.len()
        )));
    }
    Ok(configurations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configurations_reload_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("umbrella_configurations.dat");
        let labels = vec!["H".to_string(), "H".to_string()];
        let configurations = vec![
            UmbrellaConfiguration {
                xi: 0.95,
                geometry: vec![Vector3::new(-1.5, 0.0, 0.1), Vector3::new(1.5, 0.0, -0.1)],
            },
            UmbrellaConfiguration {
                xi: 1.05,
                geometry: vec![Vector3::new(-1.0 / 3.0, 0.0, 0.0), Vector3::new(1.0 / 3.0, 0.0, 0.0)],
            },
        ];
        let info = GenerationInfo {
            temperature: 300.0,
            dt: 4.134,
            evolution_steps: 100,
        };
        save(&path, &info, &labels, &configurations).unwrap();
        assert_eq!(load(&path).unwrap(), configurations);
    }
}
