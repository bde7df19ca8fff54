//! Logging initialization and configuration.

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the logging subsystem.
///
/// The level is validated, not guessed at: an unknown value is an error
/// rather than a silent fallback, so a typo in `--log-level` surfaces
/// before the probe connects.
///
/// # Errors
///
/// Returns an error if the log level is not one of trace, debug, info,
/// warn, error or off.
pub fn init(level: &str) -> Result<()> {
    let level: LevelFilter = level
        .parse()
        .with_context(|| format!("invalid log level: {level} (expected trace, debug, info, warn, error or off)"))?;
    let filter = EnvFilter::default().add_directive(level.into());

    // Logs go to stderr so stdout stays clean for the probe report
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .ok(); // Ignore if already initialized

    Ok(())
}
