//! Starting geometries for the umbrella-sampling windows.

use crate::checkpoint::configurations::{self, GenerationInfo};
use crate::error::{Result, RpmdError};
use crate::units::{au_to_ps, BOHR_ANGSTROM};
use md::propagator::replicate_geometry;
use md::{Propagator, Restraint, SimulationContext, TrajectoryOptions};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use std::path::Path;
use tracing::info;

/// Equilibrated geometry (bohr, centre of mass at the origin) for one
/// window centre.
#[derive(Debug, Clone, PartialEq)]
pub struct UmbrellaConfiguration {
    pub xi: f64,
    pub geometry: Vec<Vector3<f64>>,
}

/// Translate `geometry` so its centre of mass sits at the origin.
pub fn clean_geometry(geometry: &[Vector3<f64>], masses: &[f64]) -> Vec<Vector3<f64>> {
    let total: f64 = masses.iter().sum();
    let com = geometry
        .iter()
        .zip(masses)
        .map(|(r, &m)| r * m)
        .sum::<Vector3<f64>>()
        / total;
    geometry.iter().map(|r| r - com).collect()
}

/// First configuration at or beyond `xi`, else the last one.
pub fn start_configuration(
    configurations: &[UmbrellaConfiguration],
    xi: f64,
) -> Option<&UmbrellaConfiguration> {
    configurations
        .iter()
        .find(|c| c.xi >= xi)
        .or_else(|| configurations.last())
}

/// Previously saved configurations, if their window centres match `xi_list`.
pub fn load_matching(path: &Path, xi_list: &[f64]) -> Result<Option<Vec<UmbrellaConfiguration>>> {
    if !path.exists() {
        return Ok(None);
    }
    info!("Loading saved output from {}", path.display());
    let saved = configurations::load(path)?;
    let matches = saved.len() == xi_list.len()
        && saved.iter().zip(xi_list).all(|(c, xi)| (c.xi - xi).abs() < 1e-6);
    Ok(matches.then_some(saved))
}

/// Walks outward from the transition state, equilibrating one bead under
/// each window's restraint and seeding the next window with the result.
pub struct UmbrellaConfigurationGenerator<'a, P: Propagator + ?Sized> {
    pub propagator: &'a P,
    /// Single-bead context.
    pub context: &'a SimulationContext,
}

impl<P: Propagator + ?Sized> UmbrellaConfigurationGenerator<'_, P> {
    pub fn generate(
        &self,
        transition_state: &[Vector3<f64>],
        xi_list: &[f64],
        kforce: &[f64],
        evolution_steps: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<UmbrellaConfiguration>> {
        if kforce.len() != xi_list.len() {
            return Err(RpmdError::InvalidInput(format!(
                "{} force constants given for {} windows",
                kforce.len(),
                xi_list.len()
            )));
        }
        if xi_list.is_empty() {
            return Ok(Vec::new());
        }
        let ctx = self.context;
        let start = xi_list
            .iter()
            .position(|&xi| xi >= 1.0)
            .unwrap_or(xi_list.len() - 1);

        let mut geometries = vec![Vec::new(); xi_list.len()];
        let mut q = replicate_geometry(transition_state, ctx.n_beads);
        let order = (start..xi_list.len()).chain((0..start).rev());
        for l in order {
            if l + 1 == start {
                // Going down from the dividing surface again.
                q = replicate_geometry(&geometries[start], ctx.n_beads);
            }
            let xi = xi_list[l];
            info!(
                "Generating configuration at xi = {xi} for {} ps...",
                au_to_ps(evolution_steps as f64 * ctx.dt)
            );
            let mut p = self.propagator.sample_momentum(ctx, rng);
            let options = TrajectoryOptions {
                thermostat: true,
                ..Default::default()
            };
            self.propagator.equilibrate(
                ctx,
                &mut p,
                &mut q,
                evolution_steps,
                Restraint::new(xi, kforce[l]),
                &options,
                rng,
            )?;
            info!("Finished generating configuration at xi = {xi}.");
            geometries[l] = q.iter().map(|beads| beads[0]).collect();
        }

        let configurations: Vec<UmbrellaConfiguration> = xi_list
            .iter()
            .zip(geometries)
            .map(|(&xi, geometry)| UmbrellaConfiguration {
                xi,
                geometry: clean_geometry(&geometry, &ctx.masses),
            })
            .collect();
        for c in &configurations {
            info!("Configuration at xi = {}:", c.xi);
            for (label, r) in ctx.labels.iter().zip(&c.geometry) {
                let r = r * BOHR_ANGSTROM;
                info!("{label:<5} {:11.6} {:11.6} {:11.6}", r.x, r.y, r.z);
            }
        }
        Ok(configurations)
    }

    /// Reuse the saved configurations when the window centres match,
    /// otherwise generate and save new ones.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_or_load(
        &self,
        path: &Path,
        temperature: f64,
        transition_state: &[Vector3<f64>],
        xi_list: &[f64],
        kforce: &[f64],
        evolution_steps: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<UmbrellaConfiguration>> {
        if let Some(saved) = load_matching(path, xi_list)? {
            info!("Using results of previously saved umbrella configurations.");
            return Ok(saved
                .into_iter()
                .map(|c| UmbrellaConfiguration {
                    geometry: clean_geometry(&c.geometry, &self.context.masses),
                    ..c
                })
                .collect());
        }
        if path.exists() {
            info!("NOT using results of previously saved umbrella configurations.");
        } else {
            info!("Output will be saved to {}", path.display());
        }

        let generated =
            self.generate(transition_state, xi_list, kforce, evolution_steps, rng)?;
        let info = GenerationInfo {
            temperature,
            dt: self.context.dt,
            evolution_steps,
        };
        configurations::save(path, &info, &self.context.labels, &generated)?;
        Ok(generated)
    }
}
