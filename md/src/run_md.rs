// file: `md/src/run_md.rs`
use crate::propagator::{bead_array, BeadArray};
use itertools::izip;
use nalgebra::Vector3;

pub trait ForceProvider: Send + Sync {
    fn compute_forces(&self, positions: &[Vector3<f64>]) -> Vec<Vector3<f64>>;

    fn potential_energy(&self, positions: &[Vector3<f64>]) -> f64;
}

/// Forces acting on each bead of a ring polymer, springs excluded.
pub trait BeadForces {
    fn bead_forces(&self, q: &BeadArray) -> BeadArray;
}

/// Holonomic constraint re-imposed after every drift and kick.
pub trait Constraint {
    fn project_positions(&self, q: &mut BeadArray);
    fn project_momenta(&self, p: &mut BeadArray);
}

pub trait Integrator {
    /// Advance the system by dt
    fn step(&mut self, dt: f64);

    /// Compute the instantaneous temperature
    fn temperature(&self) -> f64;
}

/// Positions of every atom at bead index `bead`.
pub fn bead_slice(q: &BeadArray, bead: usize) -> Vec<Vector3<f64>> {
    q.iter().map(|beads| beads[bead]).collect()
}

/// Velocity Verlet for a ring polymer in Cartesian bead coordinates.
pub struct RingPolymerVerlet<'a, B: BeadForces> {
    pub p: &'a mut BeadArray,
    pub q: &'a mut BeadArray,
    masses: &'a [f64],
    field: &'a B,
    constraint: Option<&'a dyn Constraint>,
    forces: BeadArray,
    omega_n2: f64,
}

impl<'a, B: BeadForces> RingPolymerVerlet<'a, B> {
    pub fn new(
        p: &'a mut BeadArray,
        q: &'a mut BeadArray,
        masses: &'a [f64],
        field: &'a B,
        omega_n: f64,
        constraint: Option<&'a dyn Constraint>,
    ) -> Self {
        if let Some(c) = constraint {
            c.project_positions(q);
            c.project_momenta(p);
        }
        let mut integrator = RingPolymerVerlet {
            p,
            q,
            masses,
            field,
            constraint,
            forces: Vec::new(),
            omega_n2: omega_n * omega_n,
        };
        integrator.forces = integrator.total_forces();
        integrator
    }

    fn n_beads(&self) -> usize {
        self.q.first().map(|b| b.len()).unwrap_or(0)
    }

    fn total_forces(&self) -> BeadArray {
        let mut forces = self.field.bead_forces(&*self.q);
        let n = self.n_beads();
        if n > 1 {
            for (f_atom, q_atom, &m) in izip!(&mut forces, self.q.iter(), self.masses) {
                for k in 0..n {
                    let prev = q_atom[(k + n - 1) % n];
                    let next = q_atom[(k + 1) % n];
                    f_atom[k] -= m * self.omega_n2 * (2.0 * q_atom[k] - prev - next);
                }
            }
        }
        forces
    }

    fn kinetic_energy(&self) -> f64 {
        self.p
            .iter()
            .zip(self.masses)
            .map(|(beads, &m)| beads.iter().map(|v| 0.5 * v.dot(v) / m).sum::<f64>())
            .sum()
    }

    /// Replace the momenta, e.g. after a thermostat resampling.
    pub fn reset_momenta(&mut self, p: BeadArray) {
        *self.p = p;
        if let Some(c) = self.constraint {
            c.project_momenta(&mut *self.p);
        }
    }
}

impl<B: BeadForces> Integrator for RingPolymerVerlet<'_, B> {
    fn step(&mut self, dt: f64) {
        let half_dt = 0.5 * dt;

        // Update momenta (first half-step)
        for (p_atom, f_atom) in self.p.iter_mut().zip(&self.forces) {
            for (p, f) in p_atom.iter_mut().zip(f_atom) {
                *p += f * half_dt;
            }
        }
        if let Some(c) = self.constraint {
            c.project_momenta(&mut *self.p);
        }

        // Update positions (full step)
        for (q_atom, p_atom, &m) in izip!(self.q.iter_mut(), self.p.iter(), self.masses) {
            for (q, p) in q_atom.iter_mut().zip(p_atom) {
                *q += p * (dt / m);
            }
        }
        if let Some(c) = self.constraint {
            c.project_positions(&mut *self.q);
        }

        // Recompute forces
        self.forces = self.total_forces();

        // Update momenta (second half-step)
        for (p_atom, f_atom) in self.p.iter_mut().zip(&self.forces) {
            for (p, f) in p_atom.iter_mut().zip(f_atom) {
                *p += f * half_dt;
            }
        }
        if let Some(c) = self.constraint {
            c.project_momenta(&mut *self.p);
        }
    }

    /// Physical temperature estimated from the bead kinetic energy (k_B = 1).
    fn temperature(&self) -> f64 {
        let n = self.n_beads().max(1);
        let dof = 3 * self.masses.len() * n;
        2.0 * self.kinetic_energy() / (dof as f64 * n as f64)
    }
}

/// Zero external field; only the springs act.
pub struct FreeRingPolymer;

impl BeadForces for FreeRingPolymer {
    fn bead_forces(&self, q: &BeadArray) -> BeadArray {
        bead_array(q.len(), q.first().map(|b| b.len()).unwrap_or(0))
    }
}
