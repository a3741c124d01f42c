// file: `md/src/propagator.rs`
use crate::context::SimulationContext;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use std::path::PathBuf;
use thiserror::Error;

/// Ring-polymer coordinates indexed `[atom][bead]`.
pub type BeadArray = Vec<Vec<Vector3<f64>>>;

/// Allocate a zeroed bead array.
pub fn bead_array(n_atoms: usize, n_beads: usize) -> BeadArray {
    vec![vec![Vector3::zeros(); n_beads]; n_atoms]
}

/// Bead array with every bead of atom `j` placed at `geometry[j]`.
pub fn replicate_geometry(geometry: &[Vector3<f64>], n_beads: usize) -> BeadArray {
    geometry.iter().map(|&r| vec![r; n_beads]).collect()
}

/// Centroid (bead average) of each atom.
pub fn centroids(q: &BeadArray) -> Vec<Vector3<f64>> {
    q.iter()
        .map(|beads| beads.iter().sum::<Vector3<f64>>() / beads.len() as f64)
        .collect()
}

/// Negated copy of a momentum array.
pub fn negated(p: &BeadArray) -> BeadArray {
    p.iter()
        .map(|beads| beads.iter().map(|v| -v).collect())
        .collect()
}

/// Harmonic restraint `kforce/2 (xi - target)^2` on the centroid reaction
/// coordinate. With `kforce == 0` the trajectory is unrestrained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Restraint {
    pub xi: f64,
    pub kforce: f64,
}

impl Restraint {
    pub fn new(xi: f64, kforce: f64) -> Self {
        Self { xi, kforce }
    }

    /// Target coordinate only, no restoring force.
    pub fn at(xi: f64) -> Self {
        Self { xi, kforce: 0.0 }
    }
}

/// Per-call switches for a trajectory segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryOptions {
    /// Hold the centroid reaction coordinate fixed at the restraint target.
    pub constrain: bool,
    /// Apply the context thermostat.
    pub thermostat: bool,
    /// Append XYZ frames to this file.
    pub record: Option<PathBuf>,
}

/// Running sums of the reaction coordinate over every step of one
/// umbrella trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UmbrellaMoments {
    pub av: f64,
    pub av2: f64,
    pub count: usize,
}

/// Contribution of one child trajectory to the transmission coefficient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecrossingContribution {
    /// Numerator contribution at each child time step.
    pub kappa_num: Vec<f64>,
    pub kappa_denom: f64,
}

#[derive(Debug, Error)]
pub enum PropagatorError {
    #[error("bead array shape {found:?} does not match context ({atoms} atoms x {beads} beads)")]
    Shape {
        found: (usize, usize),
        atoms: usize,
        beads: usize,
    },
    #[error("trajectory became unstable at step {step} (xi = {xi})")]
    Unstable { step: usize, xi: f64 },
    #[error("invalid propagator parameter: {0}")]
    Parameter(String),
    #[error("failed to record trajectory to {path}: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stateless ring-polymer trajectory propagator.
///
/// Every call receives its own copies of the phase-space arrays and a
/// read-only context; nothing is retained between calls, so one propagator
/// can be shared by many concurrent trajectory tasks.
pub trait Propagator: Send + Sync {
    /// Centroid reaction coordinate of a configuration.
    fn reaction_coordinate(&self, q: &BeadArray) -> f64;

    /// Draw bead momenta from the Boltzmann distribution at the context
    /// temperature and bead count.
    fn sample_momentum(&self, ctx: &SimulationContext, rng: &mut StdRng) -> BeadArray;

    /// Advance `steps` steps under the restraint (or constraint), updating
    /// `p` and `q` in place.
    #[allow(clippy::too_many_arguments)]
    fn equilibrate(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        steps: usize,
        restraint: Restraint,
        options: &TrajectoryOptions,
        rng: &mut StdRng,
    ) -> Result<(), PropagatorError>;

    /// Advance `steps` restrained steps, summing xi and xi^2 at each step.
    #[allow(clippy::too_many_arguments)]
    fn umbrella_trajectory(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        steps: usize,
        restraint: Restraint,
        options: &TrajectoryOptions,
        rng: &mut StdRng,
    ) -> Result<UmbrellaMoments, PropagatorError>;

    /// Evolve an unconstrained child trajectory from the dividing surface at
    /// `xi` and return its flux-side contributions.
    #[allow(clippy::too_many_arguments)]
    fn recrossing_trajectory(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        steps: usize,
        xi: f64,
        options: &TrajectoryOptions,
        rng: &mut StdRng,
    ) -> Result<RecrossingContribution, PropagatorError>;
}

/// Validate that a bead array matches the context shape.
pub fn check_shape(ctx: &SimulationContext, a: &BeadArray) -> Result<(), PropagatorError> {
    let beads = a.first().map(|b| b.len()).unwrap_or(0);
    if a.len() != ctx.n_atoms() || a.iter().any(|b| b.len() != ctx.n_beads) {
        return Err(PropagatorError::Shape {
            found: (a.len(), beads),
            atoms: ctx.n_atoms(),
            beads: ctx.n_beads,
        });
    }
    Ok(())
}
