//! Logging setup and the fixed-width log blocks shared by every stage.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = StdSystemTime::now();
        let duration = now
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        // Format as HH:MM:SS (only seconds precision)
        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Log to stdout and append to `log_path`, so a resumed job extends the log
/// of the run it continues.
pub fn setup_output(log_path: &Path) {
    let stdout_layer = layer()
        .with_writer(std::io::stdout)
        .with_timer(SecondPrecisionTimer)
        .with_ansi(true);

    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(log) => {
            let file_layer = layer()
                .with_writer(Mutex::new(log))
                .with_timer(SecondPrecisionTimer)
                .with_ansi(false);
            Registry::default().with(stdout_layer).with(file_layer).init();
            info!("Output will be appended to: {}", log_path.display());
        }
        Err(err) => {
            Registry::default().with(stdout_layer).init();
            eprintln!("Could not open log file {}: {err}", log_path.display());
        }
    }
}

/// Title framed by asterisks.
pub fn log_banner(title: &str) {
    let stars = "*".repeat(title.len());
    info!("{stars}");
    info!("{title}");
    info!("{stars}");
    info!("");
}

pub fn log_param(name: &str, value: impl fmt::Display) {
    info!("{name:<40}= {value}");
}

pub fn log_params_heading() {
    info!("Parameters");
    info!("==========");
}
