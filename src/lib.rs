//! Ring polymer molecular dynamics rate coefficients
//!
//! Umbrella sampling and umbrella integration for the potential of mean
//! force, the parent/child recrossing protocol for the transmission
//! coefficient, and the bimolecular rate built from both. Trajectories are
//! delegated to an [`md::Propagator`].

pub mod app;
pub mod checkpoint;
pub mod config;
pub mod configuration;
pub mod error;
pub mod executor;
pub mod io;
pub mod pmf;
pub mod rate;
pub mod recrossing;
pub mod surface;
pub mod umbrella;
pub mod units;
pub mod window;

pub use error::{Result, RpmdError};
