use crate::app::job::JobSettings;
use crate::checkpoint::rate::RateCoefficient;
use crate::io::{log_banner, log_param, log_params_heading};
use crate::surface::{Reactants, TransitionStates};
use crate::units::{au_to_ps, rate_to_cm3_per_molecule_s, AMU_ME, BOHR_ANGSTROM};
use tracing::info;

pub fn report_job(settings: &JobSettings, reactants: &Reactants, transition_states: &TransitionStates) {
    log_banner(&format!("RPMD job: {}", settings.label));
    log_params_heading();
    log_param("Temperature", format!("{} K", settings.temperature));
    log_param("Number of beads", settings.beads);
    log_param("Time step", format!("{} ps", au_to_ps(settings.dt)));
    log_param("Reactant separation (Rinf)", format!("{} A", reactants.rinf * BOHR_ANGSTROM));
    log_param("Number of transition states", transition_states.len());
    info!("");

    info!("Atoms (mass in amu, transition-state position in angstrom):");
    let geometry = &transition_states.reference().geometry;
    for (idx, (label, (mass, r))) in reactants
        .labels
        .iter()
        .zip(reactants.masses.iter().zip(geometry))
        .enumerate()
    {
        let r = r * BOHR_ANGSTROM;
        info!(
            "  Atom {:>2} {:<3} {:>10.5} [{:+.6}, {:+.6}, {:+.6}]",
            idx + 1,
            label,
            mass / AMU_ME,
            r.x,
            r.y,
            r.z
        );
    }
    info!("");
}

pub fn report_rate_summary(rate: &RateCoefficient) {
    info!("Summary for T = {} K, {} beads:", rate.temperature, rate.beads);
    info!(
        "  k_QTST(T;s0)      = {:e} cm^3/(molecule*s)",
        rate_to_cm3_per_molecule_s(rate.k_qtst_s0)
    );
    info!("  Static factor     = {:e}", rate.static_factor);
    info!("  xi_max            = {:.6}", rate.xi_max);
    info!("  Recrossing factor = {:.6}", rate.recrossing_factor);
    info!(
        "  k_RPMD(T)         = {:e} cm^3/(molecule*s) = {:e} cm^3/(mol*s)",
        rate_to_cm3_per_molecule_s(rate.k_rpmd),
        rate.k_rpmd_cm3_per_mol_s()
    );
}
