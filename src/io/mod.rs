//! Input/Output operations for RPMD jobs
//!
//! Logging setup and the shared layout of log blocks. Checkpoint files live
//! in `crate::checkpoint`.

mod output;

pub use output::{log_banner, log_param, log_params_heading, setup_output};
