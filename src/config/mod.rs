//! Configuration management for RPMD rate calculations
//!
//! This module handles the YAML job description, its defaults, and the
//! command-line overrides. Physical quantities are given in macroscopic
//! units (K, ps, amu, angstrom, eV) and converted when the job is built.

mod args;

pub use args::Args;

use serde::{Deserialize, Serialize};

/// Main configuration structure for an RPMD job
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub label: Option<String>,
    /// Kelvin
    pub temperature: f64,
    pub beads: usize,
    /// Integration time step in ps
    pub time_step: f64,
    pub output_directory: Option<String>,
    pub processes: Option<usize>,
    pub seed: Option<u64>,
    pub system: SystemParams,
    pub model: ModelParams,
    pub thermostat: Option<ThermostatParams>,
    pub umbrella_configurations: UmbrellaConfigurationParams,
    pub umbrella_sampling: UmbrellaSamplingParams,
    pub recrossing: Option<RecrossingParams>,
}

/// Atom of the reacting system
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Atom {
    pub element: String,
    /// Mass override in amu; the standard atomic mass otherwise
    pub mass: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReactantParams {
    /// 1-based atom indices of the two fragments
    pub fragments: [Vec<usize>; 2],
    /// Separation of the reactant dividing surface in angstrom
    pub rinf: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransitionStateParams {
    /// Angstrom
    pub geometry: Vec<[f64; 3]>,
    pub forming_bonds: Vec<[usize; 2]>,
    pub breaking_bonds: Vec<[usize; 2]>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BondParams {
    pub forming_bonds: Vec<[usize; 2]>,
    pub breaking_bonds: Vec<[usize; 2]>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SystemParams {
    pub atoms: Vec<Atom>,
    pub reactants: ReactantParams,
    pub transition_state: TransitionStateParams,
    #[serde(default)]
    pub equivalent_transition_states: Vec<BondParams>,
}

/// Eckart barrier of the reference propagator
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelParams {
    /// eV
    pub barrier_height: f64,
    /// Angstrom
    pub barrier_width: f64,
}

/// Andersen thermostat parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ThermostatParams {
    pub enabled: Option<bool>,
    /// ps between momentum resamplings
    pub sampling_time: Option<f64>,
}

impl Default for ThermostatParams {
    fn default() -> Self {
        ThermostatParams {
            enabled: Some(true),
            sampling_time: Some(0.01),
        }
    }
}

impl ThermostatParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.enabled.is_none() {
            self.enabled = defaults.enabled;
        }
        if self.sampling_time.is_none() {
            self.sampling_time = defaults.sampling_time;
        }
        self
    }
}

/// Force constant for one or every window
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ForceConstants {
    Single(f64),
    PerWindow(Vec<f64>),
}

impl ForceConstants {
    pub fn expand(&self, windows: usize) -> Vec<f64> {
        match self {
            ForceConstants::Single(k) => vec![*k; windows],
            ForceConstants::PerWindow(ks) => ks.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UmbrellaConfigurationParams {
    /// Window centres; the window segments' centres when absent
    pub xi: Option<Vec<f64>>,
    /// Force constant in Eh
    pub kforce: ForceConstants,
    /// ps
    pub evolution_time: f64,
}

/// Window segment; the centres run from `xi_start` to `xi_end` inclusive
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WindowParams {
    pub xi_start: f64,
    pub xi_end: f64,
    pub xi_step: f64,
    pub kforce: f64,
    pub trajectories: usize,
    /// ps
    pub equilibration_time: f64,
    /// ps
    pub evolution_time: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UmbrellaSamplingParams {
    pub windows: Vec<WindowParams>,
    pub xi_min: f64,
    pub xi_max: f64,
    pub bins: usize,
    pub tolerance: Option<f64>,
    pub save_trajectories: Option<bool>,
}

impl UmbrellaSamplingParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        if self.tolerance.is_none() {
            self.tolerance = Some(1e-4);
        }
        if self.save_trajectories.is_none() {
            self.save_trajectories = Some(false);
        }
        self
    }
}

/// Recrossing factor parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecrossingParams {
    /// Dividing surface; the PMF maximum when absent
    pub xi: Option<f64>,
    /// ps
    pub equilibration_time: Option<f64>,
    pub child_trajectories: Option<usize>,
    pub children_per_sampling: Option<usize>,
    /// ps
    pub child_evolution_time: Option<f64>,
    /// ps
    pub child_sampling_time: Option<f64>,
    pub tolerance: Option<f64>,
    pub save_parent_trajectory: Option<bool>,
    pub save_child_trajectories: Option<bool>,
}

impl Default for RecrossingParams {
    fn default() -> Self {
        RecrossingParams {
            xi: None,
            equilibration_time: Some(20.0),
            child_trajectories: Some(100000),
            children_per_sampling: Some(100),
            child_evolution_time: Some(0.05),
            child_sampling_time: Some(2.0),
            tolerance: Some(1e-6),
            save_parent_trajectory: Some(false),
            save_child_trajectories: Some(false),
        }
    }
}

impl RecrossingParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.equilibration_time.is_none() {
            self.equilibration_time = defaults.equilibration_time;
        }
        if self.child_trajectories.is_none() {
            self.child_trajectories = defaults.child_trajectories;
        }
        if self.children_per_sampling.is_none() {
            self.children_per_sampling = defaults.children_per_sampling;
        }
        if self.child_evolution_time.is_none() {
            self.child_evolution_time = defaults.child_evolution_time;
        }
        if self.child_sampling_time.is_none() {
            self.child_sampling_time = defaults.child_sampling_time;
        }
        if self.tolerance.is_none() {
            self.tolerance = defaults.tolerance;
        }
        if self.save_parent_trajectory.is_none() {
            self.save_parent_trajectory = defaults.save_parent_trajectory;
        }
        if self.save_child_trajectories.is_none() {
            self.save_child_trajectories = defaults.save_child_trajectories;
        }
        self
    }
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.thermostat = Some(self.thermostat.take().unwrap_or_default().with_defaults());
        self.umbrella_sampling = self.umbrella_sampling.with_defaults();
        self.recrossing = Some(self.recrossing.take().unwrap_or_default().with_defaults());
        if self.output_directory.is_none() {
            self.output_directory = Some(".".to_string());
        }
        self
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, args: &Args) -> Self {
        if let Some(temperature) = args.temperature {
            self.temperature = temperature;
        }
        if let Some(beads) = args.beads {
            self.beads = beads;
        }
        if args.processes.is_some() {
            self.processes = args.processes;
        }
        if args.seed.is_some() {
            self.seed = args.seed;
        }
        if args.output_directory.is_some() {
            self.output_directory = args.output_directory.clone();
        }
        self
    }

    pub fn output_directory(&self) -> &str {
        self.output_directory.as_deref().unwrap_or(".")
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("rpmd")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
temperature: 300.0
beads: 4
time_step: 0.0001
system:
  atoms:
    - element: H
    - element: D
      mass: 2.014
  reactants:
    fragments: [[1], [2]]
    rinf: 8.0
  transition_state:
    geometry: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]
    forming_bonds: [[1, 2]]
    breaking_bonds: [[1, 2]]
model:
  barrier_height: 0.4
  barrier_width: 0.5
umbrella_configurations:
  kforce: 0.1
  evolution_time: 0.1
umbrella_sampling:
  windows:
    - {xi_start: 0.0, xi_end: 1.0, xi_step: 0.5, kforce: 0.1, trajectories: 2, equilibration_time: 0.1, evolution_time: 0.5}
  xi_min: 0.0
  xi_max: 1.0
  bins: 50
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = serde_yml::from_str::<Config>(MINIMAL)
            .unwrap()
            .with_defaults();
        assert_eq!(config.output_directory(), ".");
        assert_eq!(config.umbrella_sampling.tolerance, Some(1e-4));
        let recrossing = config.recrossing.unwrap();
        assert_eq!(recrossing.children_per_sampling, Some(100));
        assert_eq!(recrossing.tolerance, Some(1e-6));
        assert!(recrossing.xi.is_none());
        assert_eq!(config.thermostat.unwrap().enabled, Some(true));
        assert_eq!(config.system.atoms[1].mass, Some(2.014));
        assert_eq!(
            config.umbrella_configurations.kforce,
            ForceConstants::Single(0.1)
        );
    }

    #[test]
    fn per_window_force_constants() {
        let k: ForceConstants = serde_yml::from_str("[0.1, 0.2]").unwrap();
        assert_eq!(k.expand(2), vec![0.1, 0.2]);
        assert_eq!(ForceConstants::Single(0.3).expand(3), vec![0.3; 3]);
    }
}
