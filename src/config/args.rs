//! Command-line argument parsing for RPMD jobs

use clap::Parser;

/// Ring polymer molecular dynamics rate calculation with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override log file (default: rpmd.log in the output directory)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override output directory
    #[arg(long)]
    pub output_directory: Option<String>,

    /// Worker threads for trajectories (1: in-process, 0: one per core)
    #[arg(short, long)]
    pub processes: Option<usize>,

    /// Seed for the random number generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override temperature in K
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Override number of ring-polymer beads
    #[arg(long)]
    pub beads: Option<usize>,
}
