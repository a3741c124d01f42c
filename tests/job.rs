mod common;

use approx::assert_relative_eq;
use common::{geometry, Synthetic, DT, STEPS};
use md::Thermostat;
use rpmd::app::{build_propagator, build_system, build_windows, JobSettings, JobWorkspace, RpmdJob};
use rpmd::config::Config;
use rpmd::executor::Executor;
use rpmd::recrossing::RecrossingSettings;
use rpmd::surface::{Reactants, TransitionState, TransitionStates};
use rpmd::umbrella::PmfGrid;
use rpmd::window::{Window, WindowSet};
use rpmd::RpmdError;
use std::fs;
use std::path::{Path, PathBuf};

fn example_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("example")
        .join(filename)
}

fn job(root: &Path) -> RpmdJob<Synthetic> {
    let reactants = Reactants::new(
        vec!["H".to_string(), "H".to_string()],
        vec![1837.0, 1837.0],
        [vec![1], vec![2]],
        8.0,
    )
    .unwrap();
    let transition_states = TransitionStates::new(
        TransitionState::new(geometry(), vec![(1, 2)], vec![(1, 2)]).unwrap(),
    );
    RpmdJob::new(
        JobSettings {
            label: "synthetic".to_string(),
            temperature: 300.0,
            beads: 2,
            dt: DT,
            thermostat: Thermostat::None,
            seed: Some(42),
        },
        reactants,
        transition_states,
        Synthetic::default(),
        Executor::select(None).unwrap(),
        JobWorkspace::create(root, 300.0, 2).unwrap(),
    )
}

fn recrossing_settings() -> RecrossingSettings {
    RecrossingSettings {
        equilibration_time: DT,
        child_trajectories: 8,
        children_per_sampling: 4,
        child_evolution_time: STEPS as f64 * DT,
        child_sampling_time: DT,
        tolerance: 1e-6,
        save_parent_trajectory: false,
        save_child_trajectories: false,
    }
}

#[test]
fn rate_before_any_stage_is_a_precondition_error() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(dir.path());
    match job.compute_rate_coefficient() {
        Err(RpmdError::Precondition { stage, missing }) => {
            assert_eq!(stage, "rate coefficient");
            assert_eq!(missing, "the potential of mean force");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn recrossing_at_pmf_maximum_needs_a_pmf() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = job(dir.path());
    let err = job
        .compute_recrossing_factor(None, &recrossing_settings())
        .unwrap_err();
    assert!(matches!(
        err,
        RpmdError::Precondition {
            stage: "recrossing factor",
            ..
        }
    ));
    assert!(job.recrossing_factor().is_none());
}

#[test]
fn stages_run_in_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = job(dir.path());

    let xi_list = [0.9, 1.0, 1.1];
    let configurations = job
        .generate_umbrella_configurations(&xi_list, &[0.1; 3], STEPS as f64 * DT)
        .unwrap();
    assert_eq!(configurations.len(), 3);
    assert!(job.workspace().configurations_path().exists());

    let mut windows = WindowSet::new(
        xi_list
            .iter()
            .map(|&xi| Window::new(xi, 0.1, 2, DT, STEPS as f64 * DT))
            .collect(),
    );
    let grid = PmfGrid {
        xi_min: 0.9,
        xi_max: 1.1,
        bins: 11,
        tolerance: 1e-4,
    };
    let (xi_max, _) = job
        .compute_potential_of_mean_force(&mut windows, &configurations, grid, false)
        .unwrap()
        .argmax();

    let kappa = job
        .compute_recrossing_factor(None, &recrossing_settings())
        .unwrap()
        .kappa;
    assert_relative_eq!(kappa, 0.5);
    assert_eq!(job.recrossing_factor().unwrap().xi, xi_max);

    let rate = job.compute_rate_coefficient().unwrap();
    assert_relative_eq!(rate.k_rpmd, rate.k_qtst * 0.5, max_relative = 1e-12);
    assert_eq!(rate.xi_max, xi_max);
    let directory = job.workspace().directory();
    assert!(directory.join("rate_coefficient_2.dat").exists());
    assert!(directory.join("recrossing_factor.dat").exists());
    assert!(directory.join("potential_of_mean_force.dat").exists());
}

#[test]
fn saved_configurations_are_reused() {
    let dir = tempfile::tempdir().unwrap();
    let xi_list = [0.9, 1.0];
    let first = job(dir.path())
        .generate_umbrella_configurations(&xi_list, &[0.1; 2], DT)
        .unwrap();
    let second = job(dir.path())
        .generate_umbrella_configurations(&xi_list, &[0.1; 2], DT)
        .unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.xi, b.xi);
        for (ra, rb) in a.geometry.iter().zip(&b.geometry) {
            assert_relative_eq!(ra, rb, epsilon = 1e-9);
        }
    }
}

#[test]
fn example_configuration_builds_a_job() {
    let text = fs::read_to_string(example_path("eckart.yaml")).unwrap();
    let config = serde_yml::from_str::<Config>(&text).unwrap().with_defaults();

    let (reactants, transition_states) = build_system(&config).unwrap();
    assert_eq!(reactants.n_atoms(), 2);
    assert_eq!(transition_states.len(), 1);
    assert!(reactants.reduced_mass() > 900.0);

    let model = build_propagator(&config, &reactants, &transition_states).unwrap();
    assert!(model.r_inf > model.r_ts);

    let windows = build_windows(&config.umbrella_sampling.windows);
    assert_eq!(windows.len(), 23);
    assert_relative_eq!(windows.as_slice()[0].xi, -0.05);
    assert_relative_eq!(windows.as_slice()[22].xi, 1.05);
}
