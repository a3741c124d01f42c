use crate::units::steps_for;
use md::UmbrellaMoments;

/// One umbrella-sampling bin along the reaction coordinate.
///
/// `av`, `av2` and `count` are running sums over every time step of every
/// trajectory run so far. They only ever grow.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub xi: f64,
    pub kforce: f64,
    /// Target number of sampling trajectories.
    pub trajectories: usize,
    /// Atomic units.
    pub equilibration_time: f64,
    /// Atomic units.
    pub evolution_time: f64,
    pub count: usize,
    pub av: f64,
    pub av2: f64,
}

impl Window {
    pub fn new(
        xi: f64,
        kforce: f64,
        trajectories: usize,
        equilibration_time: f64,
        evolution_time: f64,
    ) -> Self {
        Self {
            xi,
            kforce,
            trajectories,
            equilibration_time,
            evolution_time,
            count: 0,
            av: 0.0,
            av2: 0.0,
        }
    }

    pub fn equilibration_steps(&self, dt: f64) -> usize {
        steps_for(self.equilibration_time, dt)
    }

    pub fn evolution_steps(&self, dt: f64) -> usize {
        steps_for(self.evolution_time, dt)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.av / self.count as f64)
    }

    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        Some(self.av2 / self.count as f64 - mean * mean)
    }

    pub fn accumulate(&mut self, moments: &UmbrellaMoments) {
        self.av += moments.av;
        self.av2 += moments.av2;
        self.count += moments.count;
    }

    /// True while fewer than `trajectories * evolution_steps` samples exist.
    pub fn has_budget(&self, dt: f64) -> bool {
        self.count < self.trajectories * self.evolution_steps(dt)
    }
}

/// Inclusive range of equally spaced windows sharing their parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSegment {
    pub xi_start: f64,
    pub xi_end: f64,
    pub xi_step: f64,
    pub kforce: f64,
    pub trajectories: usize,
    pub equilibration_time: f64,
    pub evolution_time: f64,
}

impl WindowSegment {
    pub fn centers(&self) -> Vec<f64> {
        if self.xi_step <= 0.0 || self.xi_end < self.xi_start {
            return vec![self.xi_start];
        }
        let n = ((self.xi_end - self.xi_start) / self.xi_step + 1e-9).floor() as usize;
        // Rounded so that 0.1 + 2 * 0.1 names its file "0.3".
        (0..=n)
            .map(|i| ((self.xi_start + i as f64 * self.xi_step) * 1e10).round() / 1e10)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSet {
    windows: Vec<Window>,
}

impl WindowSet {
    pub fn new(windows: Vec<Window>) -> Self {
        Self { windows }
    }

    pub fn from_segments(segments: &[WindowSegment]) -> Self {
        let windows = segments
            .iter()
            .flat_map(|s| {
                s.centers().into_iter().map(move |xi| {
                    Window::new(
                        xi,
                        s.kforce,
                        s.trajectories,
                        s.equilibration_time,
                        s.evolution_time,
                    )
                })
            })
            .collect();
        Self { windows }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Window> {
        self.windows.iter()
    }

    pub fn as_slice(&self) -> &[Window] {
        &self.windows
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Window> {
        self.windows.get_mut(index)
    }

    pub fn xi_values(&self) -> Vec<f64> {
        self.windows.iter().map(|w| w.xi).collect()
    }

    /// Indices of windows at or beyond `xi` that still have sampling budget.
    pub fn resample_from(&self, xi: f64, dt: f64) -> Vec<usize> {
        self.windows
            .iter()
            .enumerate()
            .filter(|(_, w)| w.xi >= xi && w.has_budget(dt))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn statistics_follow_running_sums() {
        let mut window = Window::new(1.0, 0.1, 2, 10.0, 100.0);
        assert_eq!(window.mean(), None);
        window.accumulate(&UmbrellaMoments {
            av: 10.0,
            av2: 12.0,
            count: 10,
        });
        assert_relative_eq!(window.mean().unwrap(), 1.0);
        assert_relative_eq!(window.variance().unwrap(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn budget_is_trajectories_times_evolution_steps() {
        let mut window = Window::new(1.0, 0.1, 2, 10.0, 100.0);
        assert_eq!(window.evolution_steps(1.0), 100);
        window.count = 199;
        assert!(window.has_budget(1.0));
        window.count = 200;
        assert!(!window.has_budget(1.0));
    }

    #[test]
    fn segments_expand_inclusively() {
        let segment = WindowSegment {
            xi_start: -0.05,
            xi_end: 0.25,
            xi_step: 0.1,
            kforce: 2.72,
            trajectories: 1,
            equilibration_time: 1.0,
            evolution_time: 1.0,
        };
        assert_eq!(segment.centers(), vec![-0.05, 0.05, 0.15, 0.25]);
        let set = WindowSet::from_segments(&[segment]);
        assert_eq!(set.len(), 4);
        assert_eq!(set.resample_from(0.1, 1.0), vec![2, 3]);
    }
}
