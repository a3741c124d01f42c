// file: `md/src/model.rs`
//! Reference ring-polymer propagator for a collinear two-body reaction.
//!
//! The reaction coordinate follows the usual RPMD convention: `xi = 0` on
//! the reactant dividing surface (separation `r_inf`) and `xi = 1` on the
//! transition-state surface (separation `r_ts`), linear in the centroid
//! x-separation `d` of the first two atoms:
//!
//! `xi(d) = (r_inf - d) / (r_inf - r_ts)`

use crate::context::SimulationContext;
use crate::propagator::{
    check_shape, BeadArray, Propagator, PropagatorError, RecrossingContribution, Restraint,
    TrajectoryOptions, UmbrellaMoments,
};
use crate::record::XyzRecorder;
use crate::run_md::{bead_slice, BeadForces, Constraint, ForceProvider, Integrator, RingPolymerVerlet};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

/// Steps between recorded XYZ frames.
const RECORD_STRIDE: usize = 10;

/// Bead-averaged x-separation of atoms 0 and 1.
fn centroid_separation(q: &BeadArray) -> f64 {
    let n = q[0].len() as f64;
    q[1].iter().zip(&q[0]).map(|(b, a)| b.x - a.x).sum::<f64>() / n
}

#[derive(Debug, Clone)]
pub struct CollinearModel<F: ForceProvider> {
    pub force: F,
    pub r_inf: f64,
    pub r_ts: f64,
}

impl<F: ForceProvider> CollinearModel<F> {
    pub fn new(force: F, r_inf: f64, r_ts: f64) -> Result<Self, PropagatorError> {
        if !(r_inf - r_ts).is_normal() {
            return Err(PropagatorError::Parameter(format!(
                "reactant separation {r_inf} must differ from transition-state separation {r_ts}"
            )));
        }
        Ok(Self { force, r_inf, r_ts })
    }

    /// d xi / d d
    fn gradient(&self) -> f64 {
        -1.0 / (self.r_inf - self.r_ts)
    }

    fn separation_for(&self, xi: f64) -> f64 {
        self.r_inf - xi * (self.r_inf - self.r_ts)
    }

    /// Centroid velocity along the reaction coordinate.
    fn coordinate_velocity(&self, ctx: &SimulationContext, p: &BeadArray) -> f64 {
        let n = p[0].len() as f64;
        let v0 = p[0].iter().map(|v| v.x).sum::<f64>() / (n * ctx.masses[0]);
        let v1 = p[1].iter().map(|v| v.x).sum::<f64>() / (n * ctx.masses[1]);
        self.gradient() * (v1 - v0)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_segment<O: FnMut(usize, f64)>(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        steps: usize,
        restraint: Restraint,
        options: &TrajectoryOptions,
        rng: &mut StdRng,
        mut observe: O,
    ) -> Result<(), PropagatorError> {
        check_shape(ctx, p)?;
        check_shape(ctx, q)?;
        if ctx.n_atoms() < 2 {
            return Err(PropagatorError::Parameter(
                "collinear model needs at least two atoms".to_string(),
            ));
        }

        let field = RestrainedField {
            model: self,
            restraint: if options.constrain {
                Restraint::at(restraint.xi)
            } else {
                restraint
            },
        };
        let constraint = SeparationConstraint {
            target: self.separation_for(restraint.xi),
            m0: ctx.masses[0],
            m1: ctx.masses[1],
        };
        let constraint_ref: Option<&dyn Constraint> = if options.constrain {
            Some(&constraint)
        } else {
            None
        };
        let resample_every = if options.thermostat {
            ctx.thermostat.sampling_steps(ctx.dt)
        } else {
            None
        };
        let mut recorder = match &options.record {
            Some(path) => Some(XyzRecorder::open(path)?),
            None => None,
        };

        let mut verlet = RingPolymerVerlet::new(
            p,
            q,
            &ctx.masses,
            &field,
            ctx.spring_frequency(),
            constraint_ref,
        );
        for step in 0..steps {
            if let Some(every) = resample_every {
                if step > 0 && step % every == 0 {
                    let fresh = self.sample_momentum(ctx, rng);
                    verlet.reset_momenta(fresh);
                }
            }
            verlet.step(ctx.dt);

            let xi = self.reaction_coordinate(&*verlet.q);
            if !xi.is_finite() {
                return Err(PropagatorError::Unstable { step, xi });
            }
            if let Some(recorder) = recorder.as_mut() {
                if step % RECORD_STRIDE == 0 {
                    let comment = format!("step {step} xi = {xi:.6}");
                    recorder.write_frame(&ctx.labels, &*verlet.q, &comment)?;
                }
            }
            observe(step, xi);
        }
        Ok(())
    }
}

impl<F: ForceProvider> Propagator for CollinearModel<F> {
    fn reaction_coordinate(&self, q: &BeadArray) -> f64 {
        (self.r_inf - centroid_separation(q)) / (self.r_inf - self.r_ts)
    }

    fn sample_momentum(&self, ctx: &SimulationContext, rng: &mut StdRng) -> BeadArray {
        let n = ctx.n_beads as f64;
        ctx.masses
            .iter()
            .map(|&m| {
                let sigma = (m * n / ctx.beta).sqrt();
                (0..ctx.n_beads)
                    .map(|_| {
                        Vector3::new(
                            rng.sample::<f64, _>(StandardNormal),
                            rng.sample::<f64, _>(StandardNormal),
                            rng.sample::<f64, _>(StandardNormal),
                        ) * sigma
                    })
                    .collect()
            })
            .collect()
    }

    fn equilibrate(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        steps: usize,
        restraint: Restraint,
        options: &TrajectoryOptions,
        rng: &mut StdRng,
    ) -> Result<(), PropagatorError> {
        self.run_segment(ctx, p, q, steps, restraint, options, rng, |_, _| {})
    }

    fn umbrella_trajectory(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        steps: usize,
        restraint: Restraint,
        options: &TrajectoryOptions,
        rng: &mut StdRng,
    ) -> Result<UmbrellaMoments, PropagatorError> {
        let mut moments = UmbrellaMoments::default();
        self.run_segment(ctx, p, q, steps, restraint, options, rng, |_, xi| {
            moments.av += xi;
            moments.av2 += xi * xi;
            moments.count += 1;
        })?;
        Ok(moments)
    }

    fn recrossing_trajectory(
        &self,
        ctx: &SimulationContext,
        p: &mut BeadArray,
        q: &mut BeadArray,
        steps: usize,
        xi: f64,
        options: &TrajectoryOptions,
        rng: &mut StdRng,
    ) -> Result<RecrossingContribution, PropagatorError> {
        check_shape(ctx, p)?;
        let vs = self.coordinate_velocity(ctx, p);
        let mut kappa_num = vec![0.0; steps];
        self.run_segment(ctx, p, q, steps, Restraint::at(xi), options, rng, |step, xi_t| {
            if xi_t > xi {
                kappa_num[step] = vs;
            }
        })?;
        Ok(RecrossingContribution {
            kappa_num,
            kappa_denom: vs.max(0.0),
        })
    }
}

/// Physical forces on each bead plus the umbrella bias on the centroid.
struct RestrainedField<'a, F: ForceProvider> {
    model: &'a CollinearModel<F>,
    restraint: Restraint,
}

impl<F: ForceProvider> BeadForces for RestrainedField<'_, F> {
    fn bead_forces(&self, q: &BeadArray) -> BeadArray {
        let n_beads = q[0].len();
        let mut forces: BeadArray = vec![Vec::with_capacity(n_beads); q.len()];
        for k in 0..n_beads {
            let f = self.model.force.compute_forces(&bead_slice(q, k));
            for (atom, fk) in forces.iter_mut().zip(f) {
                atom.push(fk);
            }
        }

        // Every bead feels the full centroid bias.
        if self.restraint.kforce != 0.0 {
            let xi = self.model.reaction_coordinate(q);
            let fx = -self.restraint.kforce * (xi - self.restraint.xi) * self.model.gradient();
            for k in 0..n_beads {
                forces[1][k].x += fx;
                forces[0][k].x -= fx;
            }
        }
        forces
    }
}

/// Holds the centroid separation of the first two atoms fixed while
/// preserving their centre of mass.
struct SeparationConstraint {
    target: f64,
    m0: f64,
    m1: f64,
}

impl Constraint for SeparationConstraint {
    fn project_positions(&self, q: &mut BeadArray) {
        let delta = self.target - centroid_separation(q);
        let total = self.m0 + self.m1;
        for k in 0..q[0].len() {
            q[1][k].x += delta * self.m0 / total;
            q[0][k].x -= delta * self.m1 / total;
        }
    }

    fn project_momenta(&self, p: &mut BeadArray) {
        let n = p[0].len() as f64;
        let v0 = p[0].iter().map(|v| v.x).sum::<f64>() / (n * self.m0);
        let v1 = p[1].iter().map(|v| v.x).sum::<f64>() / (n * self.m1);
        let mu = self.m0 * self.m1 / (self.m0 + self.m1);
        let dp = mu * (v1 - v0);
        for k in 0..p[0].len() {
            p[1][k].x -= dp;
            p[0][k].x += dp;
        }
    }
}
