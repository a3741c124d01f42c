// file: `md/src/eckart.rs`
use crate::run_md::ForceProvider;
use nalgebra::Vector3;

/// Symmetric Eckart barrier `V(d) = height / cosh^2((d - center) / width)`
/// acting on the x-separation `d = x_1 - x_0` of the first two atoms.
///
/// Any further atoms are spectators and feel no force.
#[derive(Debug, Clone, PartialEq)]
pub struct EckartBarrier {
    pub height: f64,
    pub width: f64,
    pub center: f64,
}

impl EckartBarrier {
    pub fn new(height: f64, width: f64, center: f64) -> Self {
        EckartBarrier {
            height,
            width,
            center,
        }
    }

    pub fn potential(&self, d: f64) -> f64 {
        let c = ((d - self.center) / self.width).cosh();
        self.height / (c * c)
    }

    /// dV/dd
    pub fn derivative(&self, d: f64) -> f64 {
        let u = (d - self.center) / self.width;
        let c = u.cosh();
        -2.0 * self.height * u.tanh() / (self.width * c * c)
    }

    fn separation(positions: &[Vector3<f64>]) -> Option<f64> {
        match positions {
            [a, b, ..] => Some(b.x - a.x),
            _ => None,
        }
    }
}

impl ForceProvider for EckartBarrier {
    fn compute_forces(&self, positions: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
        let mut forces = vec![Vector3::zeros(); positions.len()];
        if let Some(d) = Self::separation(positions) {
            let dv = self.derivative(d);
            forces[0].x += dv;
            forces[1].x -= dv;
        }
        forces
    }

    fn potential_energy(&self, positions: &[Vector3<f64>]) -> f64 {
        Self::separation(positions)
            .map(|d| self.potential(d))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn barrier_top_at_center() {
        let barrier = EckartBarrier::new(0.015, 0.7, 2.0);
        assert_relative_eq!(barrier.potential(2.0), 0.015, epsilon = 1e-15);
        assert_relative_eq!(barrier.derivative(2.0), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn forces_match_numerical_derivative() {
        let barrier = EckartBarrier::new(0.015, 0.7, 2.0);
        let positions = vec![Vector3::new(-1.1, 0.0, 0.0), Vector3::new(1.4, 0.2, 0.0)];
        let h = 1e-6;
        let forces = barrier.compute_forces(&positions);

        let mut shifted = positions.clone();
        shifted[1].x += h;
        let e_plus = barrier.potential_energy(&shifted);
        shifted[1].x -= 2.0 * h;
        let e_minus = barrier.potential_energy(&shifted);
        let numerical = -(e_plus - e_minus) / (2.0 * h);

        assert_relative_eq!(forces[1].x, numerical, epsilon = 1e-8);
        assert_relative_eq!(forces[0].x, -numerical, epsilon = 1e-8);
        assert_relative_eq!(forces[1].y, 0.0);
    }
}
