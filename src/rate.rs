//! Bimolecular RPMD rate coefficient from the PMF and the recrossing factor.

use crate::checkpoint::rate::{self as rate_file, RateCoefficient};
use crate::error::{Result, RpmdError};
use crate::io::{log_banner, log_param, log_params_heading};
use crate::pmf::PotentialOfMeanForce;
use crate::recrossing::RecrossingResult;
use crate::surface::Reactants;
use crate::units::{rate_to_cm3_per_molecule_s, AVOGADRO};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use tracing::info;

/// Centroid-density QTST rate at the reactant dividing surface `s0`.
pub fn qtst_rate_at_reactants(beta: f64, rinf: f64, reduced_mass: f64) -> f64 {
    4.0 * PI * rinf * rinf / (2.0 * PI * beta * reduced_mass).sqrt()
}

/// `exp(-beta (W(xi) - W(xi_0)))` with `W` interpolated from the PMF.
pub fn static_factor(pmf: &PotentialOfMeanForce, beta: f64, xi: f64) -> f64 {
    let w0 = pmf.free_energy()[0];
    (-beta * (pmf.interpolate(xi) - w0)).exp()
}

pub struct RateCoefficientCalculator<'a> {
    pub reactants: &'a Reactants,
    pub temperature: f64,
    pub beads: usize,
    pub beta: f64,
    pub directory: &'a Path,
}

impl RateCoefficientCalculator<'_> {
    pub fn path(&self) -> PathBuf {
        self.directory
            .join(format!("rate_coefficient_{}.dat", self.beads))
    }

    pub fn compute(
        &self,
        pmf: Option<&PotentialOfMeanForce>,
        recrossing: Option<&RecrossingResult>,
    ) -> Result<RateCoefficient> {
        let pmf = pmf.ok_or(RpmdError::Precondition {
            stage: "rate coefficient",
            missing: "the potential of mean force",
        })?;
        let recrossing = recrossing.ok_or(RpmdError::Precondition {
            stage: "rate coefficient",
            missing: "the recrossing factor",
        })?;

        log_banner("RPMD rate coefficient");
        log_params_heading();
        log_param("Temperature", format!("{} K", self.temperature));
        log_param("Number of beads", self.beads);
        info!("");

        let k_qtst_s0 = qtst_rate_at_reactants(
            self.beta,
            self.reactants.rinf,
            self.reactants.reduced_mass(),
        );
        let static_factor = static_factor(pmf, self.beta, recrossing.xi);
        let k_qtst = k_qtst_s0 * static_factor;
        let rate = RateCoefficient {
            temperature: self.temperature,
            beads: self.beads,
            k_qtst_s0,
            static_factor,
            xi_max: recrossing.xi,
            k_qtst,
            recrossing_factor: recrossing.kappa,
            k_rpmd: k_qtst * recrossing.kappa,
        };

        info!(
            "Final value of rate coefficient = {:e} cm^3/(mol*s)",
            rate_to_cm3_per_molecule_s(rate.k_rpmd) * AVOGADRO
        );
        info!("");
        rate_file::save(&self.path(), &rate)?;
        Ok(rate)
    }
}
