use crate::app::workspace::JobWorkspace;
use crate::checkpoint::rate::RateCoefficient;
use crate::configuration::{UmbrellaConfiguration, UmbrellaConfigurationGenerator};
use crate::error::{Result, RpmdError};
use crate::executor::Executor;
use crate::pmf::PotentialOfMeanForce;
use crate::rate::RateCoefficientCalculator;
use crate::recrossing::{Recrossing, RecrossingResult, RecrossingSettings};
use crate::surface::{Reactants, TransitionStates};
use crate::umbrella::{PmfGrid, UmbrellaSampling};
use crate::units::{beta, steps_for};
use crate::window::WindowSet;
use md::{Propagator, SimulationContext, Thermostat};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// Job-wide scalar parameters, in atomic units.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub label: String,
    pub temperature: f64,
    pub beads: usize,
    pub dt: f64,
    pub thermostat: Thermostat,
    /// Entropy when absent.
    pub seed: Option<u64>,
}

/// Owns the job state and runs the stages in order. Each stage keeps its
/// result so the next one can check its precondition.
pub struct RpmdJob<P: Propagator> {
    pub settings: JobSettings,
    pub reactants: Reactants,
    pub transition_states: TransitionStates,
    propagator: P,
    executor: Executor,
    workspace: JobWorkspace,
    rng: StdRng,
    pmf: Option<PotentialOfMeanForce>,
    recrossing: Option<RecrossingResult>,
}

impl<P: Propagator> RpmdJob<P> {
    pub fn new(
        settings: JobSettings,
        reactants: Reactants,
        transition_states: TransitionStates,
        propagator: P,
        executor: Executor,
        workspace: JobWorkspace,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            settings,
            reactants,
            transition_states,
            propagator,
            executor,
            workspace,
            rng,
            pmf: None,
            recrossing: None,
        }
    }

    pub fn beta(&self) -> f64 {
        beta(self.settings.temperature)
    }

    pub fn workspace(&self) -> &JobWorkspace {
        &self.workspace
    }

    pub fn potential_of_mean_force(&self) -> Option<&PotentialOfMeanForce> {
        self.pmf.as_ref()
    }

    pub fn recrossing_factor(&self) -> Option<&RecrossingResult> {
        self.recrossing.as_ref()
    }

    pub fn context(&self, n_beads: usize) -> SimulationContext {
        SimulationContext::new(
            self.beta(),
            self.settings.dt,
            n_beads,
            self.reactants.masses.clone(),
            self.reactants.labels.clone(),
            self.settings.thermostat,
        )
    }

    /// One-bead configurations for every window centre, reused from disk
    /// when the centres match. `evolution_time` is in atomic units.
    pub fn generate_umbrella_configurations(
        &mut self,
        xi_list: &[f64],
        kforce: &[f64],
        evolution_time: f64,
    ) -> Result<Vec<UmbrellaConfiguration>> {
        let ctx = self.context(1);
        let generator = UmbrellaConfigurationGenerator {
            propagator: &self.propagator,
            context: &ctx,
        };
        generator.generate_or_load(
            &self.workspace.configurations_path(),
            self.settings.temperature,
            &self.transition_states.reference().geometry,
            xi_list,
            kforce,
            steps_for(evolution_time, ctx.dt),
            &mut self.rng,
        )
    }

    pub fn compute_potential_of_mean_force(
        &mut self,
        windows: &mut WindowSet,
        configurations: &[UmbrellaConfiguration],
        grid: PmfGrid,
        save_trajectories: bool,
    ) -> Result<&PotentialOfMeanForce> {
        let ctx = self.context(self.settings.beads);
        let sampling = UmbrellaSampling {
            propagator: &self.propagator,
            context: &ctx,
            executor: &self.executor,
            directory: self.workspace.directory(),
            temperature: self.settings.temperature,
            save_trajectories,
        };
        let outcome = sampling.run(windows, configurations, grid, &mut self.rng)?;
        Ok(self.pmf.insert(outcome.pmf))
    }

    /// Transmission coefficient at `xi`, or at the PMF maximum when `xi`
    /// is not given.
    pub fn compute_recrossing_factor(
        &mut self,
        xi: Option<f64>,
        settings: &RecrossingSettings,
    ) -> Result<&RecrossingResult> {
        let xi = match (xi, self.pmf.as_ref()) {
            (Some(xi), _) => xi,
            (None, Some(pmf)) => {
                let (xi, _) = pmf.argmax();
                info!("Using xi = {xi} from the maximum of the potential of mean force.");
                xi
            }
            (None, None) => {
                return Err(RpmdError::Precondition {
                    stage: "recrossing factor",
                    missing: "the potential of mean force",
                })
            }
        };
        let ctx = self.context(self.settings.beads);
        let recrossing = Recrossing {
            propagator: &self.propagator,
            context: &ctx,
            executor: &self.executor,
            directory: self.workspace.directory(),
            temperature: self.settings.temperature,
        };
        let result = recrossing.run(
            xi,
            settings,
            &self.transition_states.reference().geometry,
            &mut self.rng,
        )?;
        Ok(self.recrossing.insert(result))
    }

    pub fn compute_rate_coefficient(&self) -> Result<RateCoefficient> {
        let calculator = RateCoefficientCalculator {
            reactants: &self.reactants,
            temperature: self.settings.temperature,
            beads: self.settings.beads,
            beta: self.beta(),
            directory: self.workspace.directory(),
        };
        calculator.compute(self.pmf.as_ref(), self.recrossing.as_ref())
    }
}
