use crate::config::{Config, WindowParams};
use crate::surface::{Reactants, TransitionState, TransitionStates};
use crate::units::{amu_to_au, angstrom_to_bohr, ps_to_au, HARTREE_EV};
use crate::window::{WindowSegment, WindowSet};
use color_eyre::eyre::{eyre, Result, WrapErr};
use md::{CollinearModel, EckartBarrier};
use nalgebra::Vector3;
use periodic_table_on_an_enum::Element;
use tracing::info;

/// Reactants and transition states from the YAML configuration, converted
/// to atomic units.
pub fn build_system(config: &Config) -> Result<(Reactants, TransitionStates)> {
    info!("Preparing reacting system...");

    let system = &config.system;
    let mut labels = Vec::with_capacity(system.atoms.len());
    let mut masses = Vec::with_capacity(system.atoms.len());
    for atom in &system.atoms {
        let element = Element::from_symbol(&atom.element)
            .ok_or_else(|| eyre!("Invalid element symbol: {}", atom.element))?;
        let mass = atom
            .mass
            .unwrap_or_else(|| f64::from(element.get_atomic_mass()));
        labels.push(element.get_symbol().to_string());
        masses.push(amu_to_au(mass));
    }

    let reactants = Reactants::new(
        labels,
        masses,
        system.reactants.fragments.clone(),
        angstrom_to_bohr(system.reactants.rinf),
    )
    .wrap_err("Invalid reactants")?;

    let ts = &system.transition_state;
    if ts.geometry.len() != reactants.n_atoms() {
        return Err(eyre!(
            "Transition state has {} atoms, system has {}",
            ts.geometry.len(),
            reactants.n_atoms()
        ));
    }
    let geometry = ts
        .geometry
        .iter()
        .map(|c| Vector3::new(c[0], c[1], c[2]).map(angstrom_to_bohr))
        .collect();
    let reference = TransitionState::new(geometry, bonds(&ts.forming_bonds), bonds(&ts.breaking_bonds))
        .wrap_err("Invalid transition state")?;

    let mut transition_states = TransitionStates::new(reference);
    for equivalent in &system.equivalent_transition_states {
        transition_states
            .add_equivalent_transition_state(
                bonds(&equivalent.forming_bonds),
                bonds(&equivalent.breaking_bonds),
            )
            .wrap_err("Invalid equivalent transition state")?;
    }

    Ok((reactants, transition_states))
}

fn bonds(pairs: &[[usize; 2]]) -> Vec<(usize, usize)> {
    pairs.iter().map(|&[a, b]| (a, b)).collect()
}

/// Eckart barrier centred on the transition-state separation of the first
/// two atoms.
pub fn build_propagator(
    config: &Config,
    reactants: &Reactants,
    transition_states: &TransitionStates,
) -> Result<CollinearModel<EckartBarrier>> {
    let geometry = &transition_states.reference().geometry;
    let r_ts = match geometry.as_slice() {
        [a, b, ..] => b.x - a.x,
        _ => return Err(eyre!("The reference propagator needs at least two atoms")),
    };
    let barrier = EckartBarrier::new(
        config.model.barrier_height / HARTREE_EV,
        angstrom_to_bohr(config.model.barrier_width),
        r_ts,
    );
    CollinearModel::new(barrier, reactants.rinf, r_ts).wrap_err("Invalid reference propagator")
}

pub fn build_windows(params: &[WindowParams]) -> WindowSet {
    let segments: Vec<WindowSegment> = params
        .iter()
        .map(|w| WindowSegment {
            xi_start: w.xi_start,
            xi_end: w.xi_end,
            xi_step: w.xi_step,
            kforce: w.kforce,
            trajectories: w.trajectories,
            equilibration_time: ps_to_au(w.equilibration_time),
            evolution_time: ps_to_au(w.evolution_time),
        })
        .collect();
    WindowSet::from_segments(&segments)
}
