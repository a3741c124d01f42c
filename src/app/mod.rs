mod job;
mod report;
mod system;
mod workspace;

pub use job::{JobSettings, RpmdJob};
pub use system::{build_propagator, build_system, build_windows};
pub use workspace::JobWorkspace;

use self::report::{report_job, report_rate_summary};
use crate::config::{Args, Config, RecrossingParams};
use crate::executor::Executor;
use crate::io::setup_output;
use crate::recrossing::RecrossingSettings;
use crate::umbrella::PmfGrid;
use crate::units::ps_to_au;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use md::Thermostat;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub struct RpmdApplication {
    args: Args,
    config: Config,
}

impl RpmdApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        let config = &self.config;
        let log_path = self
            .args
            .output
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(config.output_directory()).join("rpmd.log"));
        setup_output(&log_path);
        info!("Reading configuration from: {}", self.args.config_file);

        let (reactants, transition_states) = build_system(config)?;
        let propagator = build_propagator(config, &reactants, &transition_states)?;
        let executor =
            Executor::select(config.processes).wrap_err("Unable to set up trajectory workers")?;
        info!("Running trajectories on {} worker(s)", executor.workers());
        let workspace = JobWorkspace::create(config.output_directory(), config.temperature, config.beads)
            .wrap_err("Unable to create working directory")?;

        let settings = JobSettings {
            label: config.label().to_string(),
            temperature: config.temperature,
            beads: config.beads,
            dt: ps_to_au(config.time_step),
            thermostat: thermostat(config),
            seed: config.seed,
        };
        report_job(&settings, &reactants, &transition_states);
        let mut job = RpmdJob::new(
            settings,
            reactants,
            transition_states,
            propagator,
            executor,
            workspace,
        );

        let sampling = &config.umbrella_sampling;
        let mut windows = build_windows(&sampling.windows);
        let xi_list = config
            .umbrella_configurations
            .xi
            .clone()
            .unwrap_or_else(|| windows.xi_values());
        let kforce = config.umbrella_configurations.kforce.expand(xi_list.len());
        let configurations = job
            .generate_umbrella_configurations(
                &xi_list,
                &kforce,
                ps_to_au(config.umbrella_configurations.evolution_time),
            )
            .wrap_err("Umbrella configuration generation failed")?;

        let grid = PmfGrid {
            xi_min: sampling.xi_min,
            xi_max: sampling.xi_max,
            bins: sampling.bins,
            tolerance: sampling.tolerance.unwrap_or(1e-4),
        };
        job.compute_potential_of_mean_force(
            &mut windows,
            &configurations,
            grid,
            sampling.save_trajectories.unwrap_or(false),
        )
        .wrap_err("Umbrella sampling failed")?;

        let recrossing = config.recrossing.clone().unwrap_or_default();
        job.compute_recrossing_factor(recrossing.xi, &recrossing_settings(&recrossing))
            .wrap_err("Recrossing factor calculation failed")?;

        let rate = job
            .compute_rate_coefficient()
            .wrap_err("Rate coefficient calculation failed")?;
        report_rate_summary(&rate);

        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults()
        .with_overrides(args);

    Ok(config)
}

fn thermostat(config: &Config) -> Thermostat {
    match &config.thermostat {
        Some(params) if params.enabled.unwrap_or(true) => Thermostat::Andersen {
            sampling_time: ps_to_au(params.sampling_time.unwrap_or(0.01)),
        },
        _ => Thermostat::None,
    }
}

fn recrossing_settings(params: &RecrossingParams) -> RecrossingSettings {
    RecrossingSettings {
        equilibration_time: ps_to_au(params.equilibration_time.unwrap_or(20.0)),
        child_trajectories: params.child_trajectories.unwrap_or(100000),
        children_per_sampling: params.children_per_sampling.unwrap_or(100),
        child_evolution_time: ps_to_au(params.child_evolution_time.unwrap_or(0.05)),
        child_sampling_time: ps_to_au(params.child_sampling_time.unwrap_or(2.0)),
        tolerance: params.tolerance.unwrap_or(1e-6),
        save_parent_trajectory: params.save_parent_trajectory.unwrap_or(false),
        save_child_trajectories: params.save_child_trajectories.unwrap_or(false),
    }
}
