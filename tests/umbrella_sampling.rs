mod common;

use approx::assert_relative_eq;
use common::{context, Synthetic, DT, STEPS};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rpmd::checkpoint::pmf as pmf_file;
use rpmd::configuration::UmbrellaConfiguration;
use rpmd::executor::Executor;
use rpmd::umbrella::{PmfGrid, UmbrellaSampling};
use rpmd::units::HARTREE_EV;
use rpmd::window::{Window, WindowSet};
use rpmd::RpmdError;
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;

fn windows(trajectories: usize) -> WindowSet {
    WindowSet::new(
        [0.9, 1.0, 1.1]
            .iter()
            .map(|&xi| Window::new(xi, 0.1, trajectories, DT, STEPS as f64 * DT))
            .collect(),
    )
}

fn configurations() -> Vec<UmbrellaConfiguration> {
    [0.9, 1.0, 1.1]
        .iter()
        .map(|&xi| UmbrellaConfiguration {
            xi,
            geometry: common::geometry(),
        })
        .collect()
}

fn grid(tolerance: f64) -> PmfGrid {
    PmfGrid {
        xi_min: 0.9,
        xi_max: 1.1,
        bins: 21,
        tolerance,
    }
}

fn sampling<'a>(
    propagator: &'a Synthetic,
    ctx: &'a md::SimulationContext,
    executor: &'a Executor,
    directory: &'a Path,
) -> UmbrellaSampling<'a, Synthetic> {
    UmbrellaSampling {
        propagator,
        context: ctx,
        executor,
        directory,
        temperature: 300.0,
        save_trajectories: false,
    }
}

#[test]
fn fixed_statistics_stop_after_one_extra_pass() {
    let dir = tempfile::tempdir().unwrap();
    let propagator = Synthetic::default();
    let ctx = context(2);
    let executor = Executor::select(None).unwrap();
    let engine = sampling(&propagator, &ctx, &executor, dir.path());

    let mut set = windows(100);
    let mut rng = StdRng::seed_from_u64(1);
    let outcome = engine
        .run(&mut set, &configurations(), grid(1e-6), &mut rng)
        .unwrap();

    assert_eq!(outcome.passes, 2);
    assert_eq!(propagator.umbrella_calls.load(Ordering::SeqCst), 6);
    for window in set.iter() {
        assert_eq!(window.count, 2 * STEPS);
    }
    assert_eq!(outcome.pmf.free_energy()[0], 0.0);
    assert!(engine.pmf_path().exists());
}

#[test]
fn resumed_sampling_matches_continuous_run() {
    let executor = Executor::select(None).unwrap();
    let ctx = context(2);

    // A negative tolerance keeps every window busy until its budget is used.
    let continuous_dir = tempfile::tempdir().unwrap();
    let propagator = Synthetic::default();
    let mut continuous = windows(3);
    sampling(&propagator, &ctx, &executor, continuous_dir.path())
        .run(
            &mut continuous,
            &configurations(),
            grid(-1.0),
            &mut StdRng::seed_from_u64(7),
        )
        .unwrap();

    let resumed_dir = tempfile::tempdir().unwrap();
    let mut first = windows(1);
    sampling(&propagator, &ctx, &executor, resumed_dir.path())
        .run(
            &mut first,
            &configurations(),
            grid(-1.0),
            &mut StdRng::seed_from_u64(7),
        )
        .unwrap();
    let mut resumed = windows(3);
    sampling(&propagator, &ctx, &executor, resumed_dir.path())
        .run(
            &mut resumed,
            &configurations(),
            grid(-1.0),
            &mut StdRng::seed_from_u64(8),
        )
        .unwrap();

    assert_eq!(continuous, resumed);
    for window in resumed.iter() {
        assert_eq!(window.count, 3 * STEPS);
    }
}

#[test]
fn parallel_pool_accumulates_like_sequential() {
    let ctx = context(2);
    let propagator = Synthetic::default();

    let sequential_dir = tempfile::tempdir().unwrap();
    let sequential = Executor::select(Some(1)).unwrap();
    let mut a = windows(2);
    sampling(&propagator, &ctx, &sequential, sequential_dir.path())
        .run(&mut a, &configurations(), grid(-1.0), &mut StdRng::seed_from_u64(3))
        .unwrap();

    let parallel_dir = tempfile::tempdir().unwrap();
    let parallel = Executor::select(Some(2)).unwrap();
    let mut b = windows(2);
    sampling(&propagator, &ctx, &parallel, parallel_dir.path())
        .run(&mut b, &configurations(), grid(-1.0), &mut StdRng::seed_from_u64(3))
        .unwrap();

    assert_eq!(a, b);
}

#[test]
fn malformed_checkpoint_leaves_windows_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let propagator = Synthetic::default();
    let ctx = context(2);
    let executor = Executor::select(None).unwrap();
    let engine = sampling(&propagator, &ctx, &executor, dir.path());

    let mut set = windows(3);
    if let Some(window) = set.get_mut(0) {
        window.av = 9.0;
        window.av2 = 8.2;
        window.count = 10;
    }
    let before = set.clone();
    fs::write(
        engine.window_path(1.0),
        "****************\nNot An RPMD File\n****************\n\n",
    )
    .unwrap();

    let err = engine.resume(&mut set).unwrap_err();
    assert!(matches!(err, RpmdError::CheckpointFormat { .. }));
    assert_eq!(set, before);
    // Nothing was started for the other windows either.
    assert!(!engine.window_path(1.1).exists());
}

#[test]
fn empty_configurations_are_a_precondition_error() {
    let dir = tempfile::tempdir().unwrap();
    let propagator = Synthetic::default();
    let ctx = context(2);
    let executor = Executor::select(None).unwrap();
    let engine = sampling(&propagator, &ctx, &executor, dir.path());

    let err = engine
        .run(&mut windows(1), &[], grid(1e-4), &mut StdRng::seed_from_u64(0))
        .unwrap_err();
    assert!(matches!(err, RpmdError::Precondition { .. }));
}

#[test]
fn saved_pmf_reloads_grid_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let propagator = Synthetic::default();
    let ctx = context(2);
    let executor = Executor::select(None).unwrap();
    let engine = sampling(&propagator, &ctx, &executor, dir.path());

    let outcome = engine
        .run(
            &mut windows(1),
            &configurations(),
            grid(1e-4),
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
    let (temperature, loaded) = pmf_file::load(&engine.pmf_path()).unwrap();

    assert_eq!(temperature, 300.0);
    assert_eq!(loaded.xi(), outcome.pmf.xi());
    for (a, b) in loaded.free_energy().iter().zip(outcome.pmf.free_energy()) {
        // Stored in eV with 17 significant digits.
        assert_relative_eq!(a * HARTREE_EV, b * HARTREE_EV, epsilon = 1e-18, max_relative = 1e-14);
    }
}

#[test]
fn windows_without_a_finished_trajectory_are_sampled_on_restart() {
    let dir = tempfile::tempdir().unwrap();
    let propagator = Synthetic::default();
    let ctx = context(2);
    let executor = Executor::select(None).unwrap();
    let engine = sampling(&propagator, &ctx, &executor, dir.path());

    // Stopped after the headers were written, before the first batch ended.
    engine.resume(&mut windows(2)).unwrap();

    let mut set = windows(2);
    let outcome = engine
        .run(&mut set, &configurations(), grid(1e-4), &mut StdRng::seed_from_u64(4))
        .unwrap();
    assert!(outcome.passes >= 1);
    for window in set.iter() {
        assert!(window.count > 0);
    }
    assert!(outcome.pmf.max_abs() > 0.0);
}
