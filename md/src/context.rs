// file: `md/src/context.rs`

/// Thermostat applied during thermostatted segments of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Thermostat {
    /// No momentum resampling.
    None,
    /// Andersen thermostat: all bead momenta are redrawn from the Boltzmann
    /// distribution every `sampling_time` (atomic units).
    Andersen { sampling_time: f64 },
}

impl Thermostat {
    /// Number of integration steps between momentum resamplings, if any.
    pub fn sampling_steps(&self, dt: f64) -> Option<usize> {
        match *self {
            Thermostat::None => None,
            Thermostat::Andersen { sampling_time } => {
                Some(((sampling_time / dt).round() as usize).max(1))
            }
        }
    }
}

/// Immutable job-wide parameters handed to every propagator invocation.
///
/// All quantities are in atomic units. A context is built once per stage by
/// the job controller and shared read-only by every trajectory task.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationContext {
    /// Reciprocal temperature 1/(k_B T).
    pub beta: f64,
    /// Integration time step.
    pub dt: f64,
    /// Number of ring-polymer beads per atom.
    pub n_beads: usize,
    /// Mass of each atom.
    pub masses: Vec<f64>,
    /// Atom labels, used when recording trajectories.
    pub labels: Vec<String>,
    pub thermostat: Thermostat,
}

impl SimulationContext {
    pub fn new(
        beta: f64,
        dt: f64,
        n_beads: usize,
        masses: Vec<f64>,
        labels: Vec<String>,
        thermostat: Thermostat,
    ) -> Self {
        Self {
            beta,
            dt,
            n_beads,
            masses,
            labels,
            thermostat,
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.masses.len()
    }

    /// Copy of this context with a different bead count.
    pub fn with_beads(&self, n_beads: usize) -> Self {
        Self {
            n_beads,
            ..self.clone()
        }
    }

    /// Harmonic frequency of the springs joining neighbouring beads (hbar = 1).
    pub fn spring_frequency(&self) -> f64 {
        self.n_beads as f64 / self.beta
    }
}
