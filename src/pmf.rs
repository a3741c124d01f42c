//! Potential of mean force from umbrella-sampling window statistics.

use crate::error::{Result, RpmdError};
use crate::window::Window;
use std::f64::consts::PI;

/// Free energy (Eh) tabulated on an increasing reaction-coordinate grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialOfMeanForce {
    xi: Vec<f64>,
    free_energy: Vec<f64>,
}

impl PotentialOfMeanForce {
    pub fn new(xi: Vec<f64>, free_energy: Vec<f64>) -> std::result::Result<Self, String> {
        if xi.len() != free_energy.len() {
            return Err(format!(
                "{} grid points but {} free-energy values",
                xi.len(),
                free_energy.len()
            ));
        }
        if xi.len() < 2 {
            return Err("a potential of mean force needs at least two grid points".to_string());
        }
        if xi.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err("reaction-coordinate grid is not strictly increasing".to_string());
        }
        Ok(Self { xi, free_energy })
    }

    /// Umbrella integration over `bins` equally spaced points of
    /// `[xi_min, xi_max]`.
    ///
    /// At each grid point the slope is the average of every window's local
    /// estimate `(xi - mean)/(beta var) - kforce (xi - xi_window)`, weighted
    /// by the window's sample count times its Gaussian density at that
    /// point. Windows without samples or with a non-positive variance are
    /// left out; a point no window reaches gets slope zero. The slope is
    /// integrated with the trapezoidal rule from zero at `xi_min`.
    pub fn calculate(
        windows: &[Window],
        beta: f64,
        xi_min: f64,
        xi_max: f64,
        bins: usize,
    ) -> Result<Self> {
        if bins < 2 || xi_max <= xi_min {
            return Err(RpmdError::InvalidInput(format!(
                "PMF grid [{xi_min}, {xi_max}] with {bins} bins is empty"
            )));
        }
        let xi = linspace(xi_min, xi_max, bins);

        let stats: Vec<(f64, f64, f64, &Window)> = windows
            .iter()
            .filter_map(|w| {
                let mean = w.mean()?;
                let var = w.variance()?;
                (var > 0.0).then_some((w.count as f64, mean, var, w))
            })
            .collect();

        let slope: Vec<f64> = xi
            .iter()
            .map(|&x| {
                let (num, den) = stats.iter().fold((0.0, 0.0), |(num, den), &(n, mean, var, w)| {
                    let p = (-0.5 * (x - mean).powi(2) / var).exp() / (2.0 * PI * var).sqrt();
                    let da = (x - mean) / (beta * var) - w.kforce * (x - w.xi);
                    (num + n * p * da, den + n * p)
                });
                if den > 0.0 {
                    num / den
                } else {
                    0.0
                }
            })
            .collect();

        let mut free_energy = vec![0.0; bins];
        for n in 1..bins {
            free_energy[n] =
                free_energy[n - 1] + 0.5 * (xi[n] - xi[n - 1]) * (slope[n] + slope[n - 1]);
        }

        Ok(Self { xi, free_energy })
    }

    pub fn len(&self) -> usize {
        self.xi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xi.is_empty()
    }

    pub fn xi(&self) -> &[f64] {
        &self.xi
    }

    pub fn free_energy(&self) -> &[f64] {
        &self.free_energy
    }

    pub fn xi_min(&self) -> f64 {
        self.xi[0]
    }

    pub fn xi_max(&self) -> f64 {
        self.xi[self.xi.len() - 1]
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xi.iter().copied().zip(self.free_energy.iter().copied())
    }

    /// Largest |W| over the grid.
    pub fn max_abs(&self) -> f64 {
        self.free_energy.iter().fold(0.0, |m, w| m.max(w.abs()))
    }

    /// Grid point of the free-energy maximum (first one on ties).
    pub fn argmax(&self) -> (f64, f64) {
        let mut best = 0;
        for (i, &w) in self.free_energy.iter().enumerate() {
            if w > self.free_energy[best] {
                best = i;
            }
        }
        (self.xi[best], self.free_energy[best])
    }

    /// Natural cubic spline through the table, evaluated at `x`. Outside the
    /// grid the end intervals' cubics are extended.
    pub fn interpolate(&self, x: f64) -> f64 {
        let xs = &self.xi;
        let ys = &self.free_energy;
        let m = natural_spline_second_derivatives(xs, ys);

        let i = match xs.iter().rposition(|&xk| xk <= x) {
            Some(i) => i.min(xs.len() - 2),
            None => 0,
        };
        let h = xs[i + 1] - xs[i];
        let a = xs[i + 1] - x;
        let b = x - xs[i];
        m[i] * a.powi(3) / (6.0 * h)
            + m[i + 1] * b.powi(3) / (6.0 * h)
            + (ys[i] / h - m[i] * h / 6.0) * a
            + (ys[i + 1] / h - m[i + 1] * h / 6.0) * b
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    let step = (end - start) / (n - 1) as f64;
    let mut grid: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
    grid[n - 1] = end;
    grid
}

/// Second derivatives of the natural cubic spline (zero at both ends),
/// solved with the Thomas algorithm.
fn natural_spline_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    let h: Vec<f64> = x.windows(2).map(|p| p[1] - p[0]).collect();

    // Interior unknowns 1..n-1
    let k = n - 2;
    let mut diag = vec![0.0; k];
    let mut rhs = vec![0.0; k];
    for j in 0..k {
        let i = j + 1;
        diag[j] = 2.0 * (h[i - 1] + h[i]);
        rhs[j] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
    }
    for j in 1..k {
        let w = h[j] / diag[j - 1];
        diag[j] -= w * h[j];
        rhs[j] -= w * rhs[j - 1];
    }
    m[k] = rhs[k - 1] / diag[k - 1];
    for j in (0..k - 1).rev() {
        m[j + 1] = (rhs[j] - h[j + 1] * m[j + 2]) / diag[j];
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn window(xi: f64, kforce: f64, av: f64, av2: f64, count: usize) -> Window {
        let mut w = Window::new(xi, kforce, 1, 1.0, 1.0);
        w.av = av;
        w.av2 = av2;
        w.count = count;
        w
    }

    #[test]
    fn three_window_profile_is_anchored_at_zero() {
        let windows: Vec<Window> = [0.9, 1.0, 1.1]
            .iter()
            .map(|&xi| window(xi, 0.1, 10.0, 12.0, 10))
            .collect();
        let pmf = PotentialOfMeanForce::calculate(&windows, 1000.0, 0.9, 1.1, 3).unwrap();
        assert_eq!(pmf.len(), 3);
        assert_relative_eq!(pmf.xi()[0], 0.9);
        assert_relative_eq!(pmf.xi()[2], 1.1);
        assert_eq!(pmf.free_energy()[0], 0.0);
        assert!(pmf.free_energy().iter().all(|w| w.is_finite()));

        // All windows share mean 1 and variance 0.2, so the slope is
        // (x - 1)/(0.2 beta) - 0.1 (x - 1) and the profile is symmetric.
        let slope = |x: f64| (x - 1.0) / (0.2 * 1000.0) - 0.1 * (x - 1.0);
        let expected = 0.5 * 0.1 * (slope(0.9) + slope(1.0));
        assert_relative_eq!(pmf.free_energy()[1], expected, epsilon = 1e-12);
        assert_relative_eq!(pmf.free_energy()[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn windows_without_samples_are_ignored() {
        let empty = window(0.5, 0.1, 0.0, 0.0, 0);
        let sampled = window(1.0, 0.1, 10.0, 12.0, 10);
        let with_empty =
            PotentialOfMeanForce::calculate(&[empty, sampled.clone()], 1000.0, 0.9, 1.1, 5).unwrap();
        let without = PotentialOfMeanForce::calculate(&[sampled], 1000.0, 0.9, 1.1, 5).unwrap();
        assert_eq!(with_empty, without);
    }

    #[test]
    fn no_samples_gives_flat_profile() {
        let pmf = PotentialOfMeanForce::calculate(&[window(1.0, 0.1, 0.0, 0.0, 0)], 1.0, 0.0, 1.0, 4)
            .unwrap();
        assert!(pmf.free_energy().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn invalid_grid_is_rejected() {
        assert!(PotentialOfMeanForce::calculate(&[], 1.0, 1.0, 1.0, 10).is_err());
        assert!(PotentialOfMeanForce::calculate(&[], 1.0, 0.0, 1.0, 1).is_err());
        assert!(PotentialOfMeanForce::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn spline_passes_through_nodes_and_reproduces_lines() {
        let xi: Vec<f64> = (0..6).map(|i| i as f64 * 0.2).collect();
        let line: Vec<f64> = xi.iter().map(|x| 3.0 * x - 1.0).collect();
        let pmf = PotentialOfMeanForce::new(xi.clone(), line).unwrap();
        for &x in &[0.0, 0.13, 0.5, 0.77, 1.0] {
            assert_relative_eq!(pmf.interpolate(x), 3.0 * x - 1.0, epsilon = 1e-12);
        }

        let curve: Vec<f64> = xi.iter().map(|x| (2.0 * x).sin()).collect();
        let pmf = PotentialOfMeanForce::new(xi.clone(), curve.clone()).unwrap();
        for (x, y) in xi.iter().zip(&curve) {
            assert_relative_eq!(pmf.interpolate(*x), *y, epsilon = 1e-12);
        }
        assert_relative_eq!(pmf.interpolate(0.5), 1.0f64.sin(), epsilon = 5e-3);
    }

    #[test]
    fn argmax_and_max_abs() {
        let pmf = PotentialOfMeanForce::new(vec![0.0, 0.5, 1.0], vec![0.0, 0.02, -0.05]).unwrap();
        assert_eq!(pmf.argmax(), (0.5, 0.02));
        assert_relative_eq!(pmf.max_abs(), 0.05);
    }
}
