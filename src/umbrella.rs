//! Adaptive, resumable umbrella sampling.

use crate::checkpoint::{pmf as pmf_file, sampling};
use crate::configuration::{start_configuration, UmbrellaConfiguration};
use crate::error::{Result, RpmdError};
use crate::executor::Executor;
use crate::io::{log_banner, log_param, log_params_heading};
use crate::pmf::PotentialOfMeanForce;
use crate::units::{au_to_ps, short};
use crate::window::WindowSet;
use md::propagator::replicate_geometry;
use md::{BeadArray, Propagator, Restraint, SimulationContext, TrajectoryOptions, UmbrellaMoments};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Grid and convergence settings for the PMF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmfGrid {
    pub xi_min: f64,
    pub xi_max: f64,
    pub bins: usize,
    /// Relative to the largest |PMF| value.
    pub tolerance: f64,
}

#[derive(Debug, Clone)]
pub struct UmbrellaOutcome {
    pub pmf: PotentialOfMeanForce,
    /// Sampling passes run in this session.
    pub passes: usize,
}

struct UmbrellaTask {
    xi: f64,
    kforce: f64,
    equilibration_steps: usize,
    evolution_steps: usize,
    p: BeadArray,
    q: BeadArray,
    seed: u64,
    record: Option<PathBuf>,
}

/// Dispatches umbrella trajectories breadth-first: one trajectory for every
/// window that still needs work per pass, then a PMF convergence check.
pub struct UmbrellaSampling<'a, P: Propagator + ?Sized> {
    pub propagator: &'a P,
    pub context: &'a SimulationContext,
    pub executor: &'a Executor,
    pub directory: &'a Path,
    pub temperature: f64,
    pub save_trajectories: bool,
}

impl<'a, P: Propagator + ?Sized> UmbrellaSampling<'a, P> {
    pub fn window_path(&self, xi: f64) -> PathBuf {
        self.directory
            .join(format!("umbrella_sampling_{}.dat", short(xi)))
    }

    pub fn pmf_path(&self) -> PathBuf {
        self.directory.join("potential_of_mean_force.dat")
    }

    /// Add checkpointed sums to the windows and start files for the rest.
    /// Returns the windows with no completed row. Nothing is mutated unless
    /// every existing checkpoint loads cleanly.
    pub fn resume(&self, windows: &mut WindowSet) -> Result<Vec<usize>> {
        let mut saved = Vec::with_capacity(windows.len());
        for window in windows.iter() {
            let path = self.window_path(window.xi);
            if !path.exists() {
                saved.push(None);
                continue;
            }
            info!("Loading saved output for xi = {} from {}", window.xi, path.display());
            let checkpoint = sampling::load(&path)?;
            if (checkpoint.header.xi - window.xi).abs() >= 1e-6 {
                return Err(RpmdError::format(
                    &path,
                    format!(
                        "reaction coordinate {} does not match window {}",
                        checkpoint.header.xi, window.xi
                    ),
                ));
            }
            saved.push(Some(checkpoint.last));
        }

        let ctx = self.context;
        let mut fresh = Vec::new();
        for (index, checkpoint) in saved.into_iter().enumerate() {
            let Some(window) = windows.get_mut(index) else {
                continue;
            };
            match checkpoint {
                Some(Some(row)) => {
                    window.av += row.av;
                    window.av2 += row.av2;
                    window.count += row.count;
                }
                // Header written but no trajectory finished before the stop.
                Some(None) => fresh.push(index),
                None => {
                    let header = sampling::SamplingHeader {
                        temperature: self.temperature,
                        beads: ctx.n_beads,
                        dt: ctx.dt,
                        xi: window.xi,
                        equilibration_steps: window.equilibration_steps(ctx.dt),
                        evolution_steps: window.evolution_steps(ctx.dt),
                        kforce: window.kforce,
                    };
                    sampling::create(&self.window_path(window.xi), &header)?;
                    fresh.push(index);
                }
            }
        }
        Ok(fresh)
    }

    /// Sample until the PMF stops changing or every window that would need
    /// more work has used up its trajectory budget.
    pub fn run(
        &self,
        windows: &mut WindowSet,
        configurations: &[UmbrellaConfiguration],
        grid: PmfGrid,
        rng: &mut StdRng,
    ) -> Result<UmbrellaOutcome> {
        if configurations.is_empty() {
            return Err(RpmdError::Precondition {
                stage: "umbrella sampling",
                missing: "umbrella configurations",
            });
        }
        let ctx = self.context;

        log_banner("RPMD potential of mean force");
        log_params_heading();
        log_param("Temperature", format!("{} K", self.temperature));
        log_param("Number of beads", ctx.n_beads);
        log_param("Time step", format!("{} ps", au_to_ps(ctx.dt)));
        log_param("Number of umbrella integration windows", windows.len());
        log_param("Lower bound of reaction coordinate", grid.xi_min);
        log_param("Upper bound of reaction coordinate", grid.xi_max);
        log_param("Number of bins", grid.bins);
        info!("");

        let mut pending = self.resume(windows)?;
        let mut previous: Option<PotentialOfMeanForce> = None;
        let mut passes = 0;
        let mut stalled = false;
        loop {
            if !pending.is_empty() {
                let added = self.run_pass(windows, &pending, configurations, rng)?;
                passes += 1;
                if added == 0 {
                    warn!("Sampling pass produced no samples; stopping umbrella sampling");
                    stalled = true;
                }
            }

            let pmf = PotentialOfMeanForce::calculate(
                windows.as_slice(),
                ctx.beta,
                grid.xi_min,
                grid.xi_max,
                grid.bins,
            )?;
            pmf_file::save(&self.pmf_path(), self.temperature, &pmf)?;

            // Restart from the lower edge of the first interval that moved.
            pending = match first_divergent_bin(previous.as_ref(), &pmf, grid.tolerance) {
                Some(i) if !stalled => windows.resample_from(pmf.xi()[i - 1], ctx.dt),
                _ => Vec::new(),
            };
            previous = Some(pmf);
            if pending.is_empty() {
                break;
            }
        }

        let pmf = previous.ok_or(RpmdError::Precondition {
            stage: "umbrella sampling",
            missing: "a potential of mean force",
        })?;
        info!("Umbrella sampling finished after {passes} pass(es).");
        info!("");
        Ok(UmbrellaOutcome { pmf, passes })
    }

    /// One trajectory per pending window; returns the number of samples added.
    fn run_pass(
        &self,
        windows: &mut WindowSet,
        pending: &[usize],
        configurations: &[UmbrellaConfiguration],
        rng: &mut StdRng,
    ) -> Result<usize> {
        let ctx = self.context;
        let mut tasks = Vec::with_capacity(pending.len());
        for window in pending.iter().filter_map(|&i| windows.as_slice().get(i)) {
            let start = start_configuration(configurations, window.xi).ok_or(
                RpmdError::Precondition {
                    stage: "umbrella sampling",
                    missing: "umbrella configurations",
                },
            )?;
            info!("Spawning sampling trajectory at xi = {}...", window.xi);
            tasks.push(UmbrellaTask {
                xi: window.xi,
                kforce: window.kforce,
                equilibration_steps: window.equilibration_steps(ctx.dt),
                evolution_steps: window.evolution_steps(ctx.dt),
                p: self.propagator.sample_momentum(ctx, rng),
                q: replicate_geometry(&start.geometry, ctx.n_beads),
                seed: rng.gen(),
                record: self.save_trajectories.then(|| {
                    self.directory
                        .join(format!("umbrella_trajectory_{}.xyz", short(window.xi)))
                }),
            });
        }

        let propagator = self.propagator;
        let results = self.executor.run_batch(tasks, |mut task| -> Result<UmbrellaMoments> {
            let mut task_rng = StdRng::seed_from_u64(task.seed);
            let restraint = Restraint::new(task.xi, task.kforce);
            let options = TrajectoryOptions {
                thermostat: true,
                record: task.record.take(),
                ..Default::default()
            };
            propagator.equilibrate(
                ctx,
                &mut task.p,
                &mut task.q,
                task.equilibration_steps,
                restraint,
                &options,
                &mut task_rng,
            )?;
            Ok(propagator.umbrella_trajectory(
                ctx,
                &mut task.p,
                &mut task.q,
                task.evolution_steps,
                restraint,
                &options,
                &mut task_rng,
            )?)
        })?;

        let mut added = 0;
        for (&index, moments) in pending.iter().zip(&results) {
            let Some(window) = windows.get_mut(index) else {
                continue;
            };
            info!("Processing trajectory at xi = {}...", window.xi);
            window.accumulate(moments);
            added += moments.count;
            if let (Some(mean), Some(variance)) = (window.mean(), window.variance()) {
                if moments.count > 0 {
                    info!(
                        "{:11} {:15.8} {:15.8} {:15.5e}",
                        window.count,
                        mean,
                        window.av2 / window.count as f64,
                        variance
                    );
                }
            }
            sampling::append_row(&self.window_path(window.xi), window)?;
        }
        Ok(added)
    }
}

/// First grid point (after the anchor) whose free energy moved by more than
/// `tolerance` times the largest |PMF|. With no previous profile the
/// comparison is against zero.
pub fn first_divergent_bin(
    previous: Option<&PotentialOfMeanForce>,
    current: &PotentialOfMeanForce,
    tolerance: f64,
) -> Option<usize> {
    let threshold = tolerance * current.max_abs();
    (1..current.len()).find(|&i| {
        let before = previous
            .and_then(|p| p.free_energy().get(i).copied())
            .unwrap_or(0.0);
        (current.free_energy()[i] - before).abs() > threshold
    })
}
