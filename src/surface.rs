//! Reactant and transition-state dividing surfaces.

use crate::error::{Result, RpmdError};
use nalgebra::Vector3;
use std::collections::HashMap;

/// A bond between two atoms, 1-based.
pub type Bond = (usize, usize);

/// Reactant dividing surface: the two fragments at separation `rinf`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reactants {
    pub labels: Vec<String>,
    /// Atomic units.
    pub masses: Vec<f64>,
    /// 1-based atom indices of each fragment.
    pub fragments: [Vec<usize>; 2],
    /// Bohr.
    pub rinf: f64,
}

impl Reactants {
    pub fn new(
        labels: Vec<String>,
        masses: Vec<f64>,
        fragments: [Vec<usize>; 2],
        rinf: f64,
    ) -> Result<Self> {
        if labels.len() != masses.len() {
            return Err(RpmdError::InvalidInput(format!(
                "{} atom labels given for {} masses",
                labels.len(),
                masses.len()
            )));
        }
        let n_atoms = masses.len();
        if let Some(&atom) = fragments
            .iter()
            .flatten()
            .find(|&&atom| atom == 0 || atom > n_atoms)
        {
            return Err(RpmdError::InvalidInput(format!(
                "reactant atom index {atom} out of range 1..={n_atoms}"
            )));
        }
        if fragments.iter().any(Vec::is_empty) {
            return Err(RpmdError::InvalidInput(
                "each reactant fragment needs at least one atom".to_string(),
            ));
        }
        Ok(Self {
            labels,
            masses,
            fragments,
            rinf,
        })
    }

    pub fn n_atoms(&self) -> usize {
        self.masses.len()
    }

    pub fn fragment_mass(&self, fragment: usize) -> f64 {
        self.fragments[fragment]
            .iter()
            .map(|&atom| self.masses[atom - 1])
            .sum()
    }

    pub fn reduced_mass(&self) -> f64 {
        let (ma, mb) = (self.fragment_mass(0), self.fragment_mass(1));
        ma * mb / (ma + mb)
    }
}

/// Transition-state dividing surface, defined by its geometry and the bonds
/// that form and break.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionState {
    /// Bohr.
    pub geometry: Vec<Vector3<f64>>,
    pub forming_bonds: Vec<Bond>,
    pub breaking_bonds: Vec<Bond>,
}

impl TransitionState {
    pub fn new(
        geometry: Vec<Vector3<f64>>,
        forming_bonds: Vec<Bond>,
        breaking_bonds: Vec<Bond>,
    ) -> Result<Self> {
        if forming_bonds.len() != breaking_bonds.len() {
            return Err(RpmdError::InvalidInput(format!(
                "{} forming bonds given for {} breaking bonds",
                forming_bonds.len(),
                breaking_bonds.len()
            )));
        }
        let n_atoms = geometry.len();
        if let Some(&atom) = forming_bonds
            .iter()
            .chain(&breaking_bonds)
            .flat_map(|(a, b)| [a, b])
            .find(|&&atom| atom == 0 || atom > n_atoms)
        {
            return Err(RpmdError::InvalidInput(format!(
                "bond atom index {atom} out of range 1..={n_atoms}"
            )));
        }
        Ok(Self {
            geometry,
            forming_bonds,
            breaking_bonds,
        })
    }

    /// The same saddle point with atoms relabelled so that the given bonds
    /// play the role of this state's forming and breaking bonds.
    pub fn equivalent(&self, forming_bonds: Vec<Bond>, breaking_bonds: Vec<Bond>) -> Result<Self> {
        let n_atoms = self.geometry.len();
        if forming_bonds.len() != self.forming_bonds.len()
            || breaking_bonds.len() != self.breaking_bonds.len()
        {
            return Err(RpmdError::InvalidInput(format!(
                "equivalent transition state needs {} forming and {} breaking bonds",
                self.forming_bonds.len(),
                self.breaking_bonds.len()
            )));
        }

        let mut mapping = HashMap::new();
        let pairs = self
            .forming_bonds
            .iter()
            .zip(&forming_bonds)
            .chain(self.breaking_bonds.iter().zip(&breaking_bonds));
        for (&(a1, a2), &(b1, b2)) in pairs {
            map_pair(&mut mapping, a1, b1)?;
            map_pair(&mut mapping, a2, b2)?;
        }

        let geometry = (1..=n_atoms)
            .map(|atom| {
                let source = mapping.get(&atom).copied().unwrap_or(atom);
                self.geometry.get(source - 1).copied().ok_or_else(|| {
                    RpmdError::InvalidInput(format!(
                        "bond atom index {source} out of range 1..={n_atoms}"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        TransitionState::new(geometry, forming_bonds, breaking_bonds)
    }
}

fn map_pair(mapping: &mut HashMap<usize, usize>, a: usize, b: usize) -> Result<()> {
    for (atom, partner) in [(a, b), (b, a)] {
        if let Some(&first) = mapping.get(&atom) {
            if first != partner {
                return Err(RpmdError::InconsistentMapping {
                    atom,
                    first,
                    second: partner,
                });
            }
        }
    }
    mapping.insert(a, b);
    mapping.insert(b, a);
    Ok(())
}

/// All transition states of the reaction; the first one is the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionStates {
    states: Vec<TransitionState>,
}

impl TransitionStates {
    pub fn new(reference: TransitionState) -> Self {
        Self {
            states: vec![reference],
        }
    }

    pub fn reference(&self) -> &TransitionState {
        &self.states[0]
    }

    pub fn add_equivalent_transition_state(
        &mut self,
        forming_bonds: Vec<Bond>,
        breaking_bonds: Vec<Bond>,
    ) -> Result<&TransitionState> {
        let state = self.reference().equivalent(forming_bonds, breaking_bonds)?;
        self.states.push(state);
        Ok(&self.states[self.states.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransitionState> {
        self.states.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn abc() -> TransitionState {
        // A-B...C with B-C forming and A-B breaking.
        TransitionState::new(
            vec![
                Vector3::new(-2.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.5, 0.0, 0.0),
            ],
            vec![(2, 3)],
            vec![(1, 2)],
        )
        .unwrap()
    }

    #[test]
    fn reduced_mass_of_fragments() {
        let reactants = Reactants::new(
            vec!["H".into(), "H".into(), "H".into()],
            vec![1.0, 1.0, 2.0],
            [vec![1, 2], vec![3]],
            10.0,
        )
        .unwrap();
        assert_relative_eq!(reactants.reduced_mass(), 1.0);
    }

    #[test]
    fn out_of_range_fragment_is_rejected() {
        let result = Reactants::new(vec!["H".into()], vec![1.0], [vec![1], vec![2]], 10.0);
        assert!(matches!(result, Err(RpmdError::InvalidInput(_))));
    }

    #[test]
    fn equivalent_state_swaps_end_atoms() {
        let mut states = TransitionStates::new(abc());
        let swapped = states
            .add_equivalent_transition_state(vec![(2, 1)], vec![(3, 2)])
            .unwrap()
            .clone();
        assert_eq!(states.len(), 2);
        // 2<->2 is kept, 3<->1 swapped.
        assert_eq!(swapped.geometry[0], abc().geometry[2]);
        assert_eq!(swapped.geometry[1], abc().geometry[1]);
        assert_eq!(swapped.geometry[2], abc().geometry[0]);
    }

    #[test]
    fn inconsistent_mapping_names_atom_and_partners() {
        let err = abc().equivalent(vec![(3, 1)], vec![(2, 3)]).unwrap_err();
        match err {
            RpmdError::InconsistentMapping {
                atom,
                first,
                second,
            } => {
                assert_eq!(atom, 3);
                assert_eq!(first, 2);
                assert_eq!(second, 1);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
