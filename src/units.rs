//! Conversions between macroscopic and atomic units.

/// Atomic unit of time in picoseconds.
pub const AU_TIME_PS: f64 = 2.418884326505e-5;
/// Atomic unit of time in femtoseconds.
pub const AU_TIME_FS: f64 = 2.418884326505e-2;
/// Hartree in joules.
pub const HARTREE_J: f64 = 4.35974417e-18;
/// Hartree in electronvolts.
pub const HARTREE_EV: f64 = 27.211386;
/// Boltzmann constant in J/K.
pub const BOLTZMANN_J_PER_K: f64 = 1.380649e-23;
/// Atomic mass unit in electron masses.
pub const AMU_ME: f64 = 1822.888486;
/// Bohr radius in angstroms.
pub const BOHR_ANGSTROM: f64 = 0.52917721092;
/// Avogadro constant in 1/mol.
pub const AVOGADRO: f64 = 6.02214076e23;

/// Reciprocal temperature in 1/Eh for a temperature in kelvin.
pub fn beta(temperature: f64) -> f64 {
    HARTREE_J / (BOLTZMANN_J_PER_K * temperature)
}

pub fn ps_to_au(time: f64) -> f64 {
    time / AU_TIME_PS
}

pub fn au_to_ps(time: f64) -> f64 {
    time * AU_TIME_PS
}

pub fn angstrom_to_bohr(length: f64) -> f64 {
    length / BOHR_ANGSTROM
}

pub fn amu_to_au(mass: f64) -> f64 {
    mass * AMU_ME
}

/// Bimolecular rate coefficient in cm^3/(molecule*s) for a value in atomic
/// units.
pub fn rate_to_cm3_per_molecule_s(rate: f64) -> f64 {
    let a0_cm = BOHR_ANGSTROM * 1e-8;
    rate * a0_cm.powi(3) / (AU_TIME_PS * 1e-12)
}

pub fn rate_from_cm3_per_molecule_s(rate: f64) -> f64 {
    rate / rate_to_cm3_per_molecule_s(1.0)
}

/// Number of integration steps covering `time` (both in atomic units).
pub fn steps_for(time: f64, dt: f64) -> usize {
    (time / dt).round() as usize
}

/// Shortest decimal that reads back to the same value, used for directory
/// and file names.
pub fn short(value: f64) -> String {
    format!("{value}")
}
