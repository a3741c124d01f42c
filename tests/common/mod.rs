//! Synthetic propagators shared by the integration tests.

#![allow(dead_code)]

use md::propagator::{bead_array, check_shape};
use md::{
    BeadArray, Propagator, PropagatorError, RecrossingContribution, Restraint, SimulationContext,
    Thermostat, TrajectoryOptions, UmbrellaMoments,
};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const STEPS: usize = 10;
pub const DT: f64 = 10.0;

pub fn context(n_beads: usize) -> SimulationContext {
    SimulationContext::new(
        1000.0,
        DT,
        n_beads,
        vec![1837.0, 1837.0],
        vec!["H".to_string(), "H".to_string()],
        Thermostat::None,
    )
}

pub fn geometry() -> Vec<Vector3<f64>> {
    vec![Vector3::zeros(), Vector3::new(2.0, 0.0, 0.0)]
}

/// Child launch as seen by the propagator.
#[derive(Debug, Clone, PartialEq)]
pub struct Launch {
    pub p: BeadArray,
    pub q: BeadArray,
    pub recorded: bool,
}

/// Returns the same statistics every call: each umbrella trajectory samples
/// a Gaussian centred slightly above its window, each child contributes a
/// constant flux.
#[derive(Default)]
pub struct Synthetic {
    pub umbrella_calls: AtomicUsize,
    pub launches: Mutex<Vec<Launch>>,
}

impl Synthetic {
    pub fn moments(xi: f64) -> UmbrellaMoments {
        let mean = xi + 0.01;
        let variance = 0.001;
        UmbrellaMoments {
            av: mean * STEPS as f64,
            av2: (mean * mean + variance) * STEPS as f64,
            count: STEPS,
        }
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }
}

impl Propagator for Synthetic {
    fn reaction_coordinate(&self, q: &BeadArray) -> f64 {
        q[1][0].x - q[0][0].x
    }

    fn sample_momentum(&self, ctx: &SimulationContext, rng: &mut StdRng) -> BeadArray {
        let mut p = bead_array(ctx.n_atoms(), ctx.n_beads);
        for bead in p.iter_mut().flatten() {
            *bead = Vector3::new(rng.gen(), rng.gen(), rng.gen());
        }
        p
    }

    fn equilibrate(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        _steps: usize,
        _restraint: Restraint,
        _options: &TrajectoryOptions,
        _rng: &mut StdRng,
    ) -> Result<(), PropagatorError> {
        check_shape(ctx, p)?;
        check_shape(ctx, q)?;
        // Move the parent so consecutive batches start elsewhere.
        for bead in q.iter_mut().flatten() {
            bead.y += 0.1;
        }
        Ok(())
    }

    fn umbrella_trajectory(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        _q: &mut BeadArray,
        steps: usize,
        restraint: Restraint,
        _options: &TrajectoryOptions,
        _rng: &mut StdRng,
    ) -> Result<UmbrellaMoments, PropagatorError> {
        check_shape(ctx, p)?;
        assert_eq!(steps, STEPS);
        self.umbrella_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::moments(restraint.xi))
    }

    fn recrossing_trajectory(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        steps: usize,
        _xi: f64,
        options: &TrajectoryOptions,
        _rng: &mut StdRng,
    ) -> Result<RecrossingContribution, PropagatorError> {
        check_shape(ctx, p)?;
        self.launches.lock().unwrap().push(Launch {
            p: p.clone(),
            q: q.clone(),
            recorded: options.record.is_some(),
        });
        Ok(RecrossingContribution {
            kappa_num: vec![0.25; steps],
            kappa_denom: 0.5,
        })
    }
}
