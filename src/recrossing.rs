//! Transmission coefficient from a constrained parent trajectory and
//! batches of antithetic child trajectories.

use crate::checkpoint::recrossing::{self as recrossing_file, RecrossingCheckpoint};
use crate::error::{Result, RpmdError};
use crate::executor::Executor;
use crate::io::{log_banner, log_param, log_params_heading};
use crate::units::{au_to_ps, steps_for, AU_TIME_FS};
use md::propagator::{negated, replicate_geometry};
use md::{
    BeadArray, Propagator, RecrossingContribution, Restraint, SimulationContext,
    TrajectoryOptions,
};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::info;

/// Number of consecutive estimates that must agree before stopping.
pub const HISTORY_LEN: usize = 10;

/// Recrossing-stage inputs; times in atomic units.
#[derive(Debug, Clone, PartialEq)]
pub struct RecrossingSettings {
    pub equilibration_time: f64,
    pub child_trajectories: usize,
    pub children_per_sampling: usize,
    pub child_evolution_time: f64,
    pub child_sampling_time: f64,
    pub tolerance: f64,
    pub save_parent_trajectory: bool,
    pub save_child_trajectories: bool,
}

/// Running numerator/denominator sums and the recent estimate history.
#[derive(Debug, Clone, PartialEq)]
pub struct RecrossingState {
    pub kappa_num: Vec<f64>,
    pub kappa_denom: f64,
    pub child_count: usize,
    pub parent_iter: usize,
    history: VecDeque<f64>,
}

impl RecrossingState {
    pub fn new(evolution_steps: usize) -> Self {
        Self {
            kappa_num: vec![0.0; evolution_steps],
            kappa_denom: 0.0,
            child_count: 0,
            parent_iter: 0,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// `kappa_num[last] / kappa_denom`, or zero before any flux was seen.
    pub fn kappa(&self) -> f64 {
        match self.kappa_num.last() {
            Some(&num) if self.kappa_denom != 0.0 => num / self.kappa_denom,
            _ => 0.0,
        }
    }

    pub fn absorb(&mut self, contribution: &RecrossingContribution) -> Result<()> {
        self.absorb_batch(std::slice::from_ref(contribution))
    }

    /// Add a whole batch. The sums are untouched unless every child
    /// returned the expected number of steps.
    pub fn absorb_batch(&mut self, batch: &[RecrossingContribution]) -> Result<()> {
        if let Some(bad) = batch
            .iter()
            .find(|c| c.kappa_num.len() != self.kappa_num.len())
        {
            return Err(RpmdError::InvalidInput(format!(
                "child trajectory returned {} steps, expected {}",
                bad.kappa_num.len(),
                self.kappa_num.len()
            )));
        }
        for contribution in batch {
            for (sum, value) in self.kappa_num.iter_mut().zip(&contribution.kappa_num) {
                *sum += value;
            }
            self.kappa_denom += contribution.kappa_denom;
        }
        Ok(())
    }

    pub fn record_estimate(&mut self) {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(self.kappa());
    }

    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    /// True once `HISTORY_LEN` estimates exist and each lies within
    /// `tolerance * |newest|` of the newest.
    pub fn converged(&self, tolerance: f64) -> bool {
        let Some(&newest) = self.history.back() else {
            return false;
        };
        self.history.len() >= HISTORY_LEN
            && self
                .history
                .iter()
                .all(|k| (k - newest).abs() <= tolerance * newest.abs())
    }

    /// `(time in fs, kappa_num/kappa_denom, kappa_num/child_count)` per
    /// child time step.
    pub fn series(&self, dt: f64) -> Vec<(f64, f64, f64)> {
        let ratio = |a: f64, b: f64| if b != 0.0 { a / b } else { 0.0 };
        self.kappa_num
            .iter()
            .enumerate()
            .map(|(n, &num)| {
                (
                    n as f64 * dt * AU_TIME_FS,
                    ratio(num, self.kappa_denom),
                    ratio(num, self.child_count as f64),
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecrossingResult {
    pub xi: f64,
    pub kappa: f64,
    pub child_count: usize,
    /// See [`RecrossingState::series`].
    pub series: Vec<(f64, f64, f64)>,
}

struct ChildTask {
    p: BeadArray,
    q: BeadArray,
    seed: u64,
    record: Option<PathBuf>,
}

pub struct Recrossing<'a, P: Propagator + ?Sized> {
    pub propagator: &'a P,
    pub context: &'a SimulationContext,
    pub executor: &'a Executor,
    pub directory: &'a Path,
    pub temperature: f64,
}

impl<P: Propagator + ?Sized> Recrossing<'_, P> {
    pub fn path(&self) -> PathBuf {
        self.directory.join("recrossing_factor.dat")
    }

    fn compatible(&self, saved: &RecrossingCheckpoint, xi: f64, evolution_steps: usize) -> bool {
        let ctx = self.context;
        saved.temperature == self.temperature
            && saved.beads == ctx.n_beads
            && ((saved.dt - ctx.dt) / ctx.dt).abs() < 1e-9
            && (saved.xi - xi).abs() < 1e-6
            && saved.kappa_num.len() == evolution_steps
    }

    pub fn run(
        &self,
        xi: f64,
        settings: &RecrossingSettings,
        transition_state: &[Vector3<f64>],
        rng: &mut StdRng,
    ) -> Result<RecrossingResult> {
        let cps = settings.children_per_sampling;
        if cps == 0 || cps % 2 != 0 {
            return Err(RpmdError::InvalidInput(format!(
                "children per sampling must be a positive even number, got {cps}"
            )));
        }
        let ctx = self.context;
        let equilibration_steps = steps_for(settings.equilibration_time, ctx.dt);
        let evolution_steps = steps_for(settings.child_evolution_time, ctx.dt);
        let sampling_steps = steps_for(settings.child_sampling_time, ctx.dt);
        let ps = |steps: usize| au_to_ps(steps as f64 * ctx.dt);

        log_banner("RPMD recrossing factor");
        log_params_heading();
        log_param("Temperature", format!("{} K", self.temperature));
        log_param("Number of beads", ctx.n_beads);
        log_param("Reaction coordinate", xi);
        log_param("Time step", format!("{} ps", au_to_ps(ctx.dt)));
        log_param("Total number of child trajectories", settings.child_trajectories);
        log_param(
            "Initial parent equilibration time",
            format!("{} ps ({equilibration_steps} steps)", ps(equilibration_steps)),
        );
        log_param(
            "Frequency of child trajectory sampling",
            format!("{} ps ({sampling_steps} steps)", ps(sampling_steps)),
        );
        log_param(
            "Length of child trajectories",
            format!("{} ps ({evolution_steps} steps)", ps(evolution_steps)),
        );
        log_param("Number of children per sampling", cps);
        info!("");

        let path = self.path();
        let mut state = RecrossingState::new(evolution_steps);
        if path.exists() {
            info!("Loading saved output from {}", path.display());
            let saved = recrossing_file::load(&path)?;
            if self.compatible(&saved, xi, evolution_steps) {
                info!("Including previously saved output in calculation.");
                state.kappa_num = saved.kappa_num;
                state.kappa_denom = saved.kappa_denom;
                state.child_count = saved.count;
                info!(
                    "Saved output contained {} child trajectories; {} additional trajectories will be run.",
                    state.child_count,
                    settings.child_trajectories.saturating_sub(state.child_count)
                );
            } else {
                info!("NOT including previously saved output in calculation.");
            }
        } else {
            info!("Output will be saved to {}", path.display());
        }
        info!("");

        if state.child_count < settings.child_trajectories {
            let parent_options = TrajectoryOptions {
                constrain: true,
                thermostat: true,
                record: settings
                    .save_parent_trajectory
                    .then(|| self.directory.join("parent_trajectory.xyz")),
            };
            let mut q = replicate_geometry(transition_state, ctx.n_beads);
            let mut p = self.propagator.sample_momentum(ctx, rng);
            info!("Equilibrating parent trajectory for {} ps...", ps(equilibration_steps));
            self.propagator.equilibrate(
                ctx,
                &mut p,
                &mut q,
                equilibration_steps,
                Restraint::at(xi),
                &parent_options,
                rng,
            )?;
            info!("Finished equilibrating parent trajectory.");
            info!("");

            let checkpoint_base = RecrossingCheckpoint {
                temperature: self.temperature,
                beads: ctx.n_beads,
                xi,
                dt: ctx.dt,
                child_trajectories: settings.child_trajectories,
                equilibration_steps,
                sampling_steps,
                evolution_steps,
                children_per_sampling: cps,
                kappa_num: Vec::new(),
                kappa_denom: 0.0,
                count: 0,
            };

            let mut converged = false;
            while state.child_count < settings.child_trajectories && !converged {
                let at = ps(state.parent_iter * sampling_steps);
                info!("Sampling {cps} child trajectories at {at} ps...");
                let tasks = self.child_batch(&q, cps, settings.save_child_trajectories, rng);
                let propagator = self.propagator;
                let contributions = self.executor.run_batch(tasks, |mut task| {
                    let mut task_rng = StdRng::seed_from_u64(task.seed);
                    let options = TrajectoryOptions {
                        record: task.record.take(),
                        ..Default::default()
                    };
                    Ok(propagator.recrossing_trajectory(
                        ctx,
                        &mut task.p,
                        &mut task.q,
                        evolution_steps,
                        xi,
                        &options,
                        &mut task_rng,
                    )?)
                })?;
                state.absorb_batch(&contributions)?;
                state.child_count += cps;
                info!("Finished sampling {cps} child trajectories at {at} ps.");

                recrossing_file::save(
                    &path,
                    &RecrossingCheckpoint {
                        kappa_num: state.kappa_num.clone(),
                        kappa_denom: state.kappa_denom,
                        count: state.child_count,
                        ..checkpoint_base.clone()
                    },
                )?;
                info!("Current value of transmission coefficient = {:.6}", state.kappa());
                info!("");

                state.record_estimate();
                converged = state.converged(settings.tolerance);

                info!(
                    "Evolving parent trajectory to {} ps...",
                    ps((state.parent_iter + 1) * sampling_steps)
                );
                self.propagator.equilibrate(
                    ctx,
                    &mut p,
                    &mut q,
                    sampling_steps,
                    Restraint::at(xi),
                    &parent_options,
                    rng,
                )?;
                state.parent_iter += 1;
            }
            info!("Finished sampling of {} child trajectories.", state.child_count);
            info!("");
        }

        let series = state.series(ctx.dt);
        info!("Result of recrossing factor calculation:");
        info!("");
        info!("=========== =========== ===========");
        info!("Time (fs)   kappa (new) kappa (old)");
        info!("=========== =========== ===========");
        for (time, kappa_new, kappa_old) in &series {
            info!("{time:11.3} {kappa_new:11.6} {kappa_old:11.6}");
        }
        info!("=========== =========== ===========");
        info!("");
        info!("Final value of transmission coefficient = {:.6}", state.kappa());
        info!("");

        Ok(RecrossingResult {
            xi,
            kappa: state.kappa(),
            child_count: state.child_count,
            series,
        })
    }

    /// Antithetic pairs from one parent configuration: for each momentum
    /// draw, one child starts with `-p` and its partner with `p`. Only the
    /// first child of the batch is recorded.
    fn child_batch(
        &self,
        q: &BeadArray,
        children: usize,
        record: bool,
        rng: &mut StdRng,
    ) -> Vec<ChildTask> {
        let mut tasks = Vec::with_capacity(children);
        for pair in 0..children / 2 {
            let p = self.propagator.sample_momentum(self.context, rng);
            tasks.push(ChildTask {
                p: negated(&p),
                q: q.clone(),
                seed: rng.gen(),
                record: (record && pair == 0).then(|| self.directory.join("child_trajectory.xyz")),
            });
            tasks.push(ChildTask {
                p,
                q: q.clone(),
                seed: rng.gen(),
                record: None,
            });
        }
        tasks
    }
}
