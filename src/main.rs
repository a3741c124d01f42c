//! RPMD rate calculation command-line interface
//!
//! This is the main entry point for running RPMD jobs with YAML configuration.

use color_eyre::eyre::Result;
use rpmd::app::RpmdApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    RpmdApplication::from_cli()?.run()
}
