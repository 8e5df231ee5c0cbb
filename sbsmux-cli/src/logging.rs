// ============================================================================
// sbsmux-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: log file or stderr logger for one CLI run
//
// By default every batch run writes `sbsmux_run_<timestamp>.log` through the
// core's log4rs setup. `--no-log` switches to env_logger on stderr, which
// honours RUST_LOG.

use crate::cli::CommonArgs;
use crate::error::{CliErrorContext, CliResult};
use log::LevelFilter;
use sbsmux_core::file_logging::setup_file_logging;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Log file name for a run started at `timestamp`.
pub fn log_file_name(timestamp: &str) -> String {
    format!("sbsmux_run_{timestamp}.log")
}

pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initializes logging for a batch command.
///
/// Returns the log file path, or `None` when `--no-log` routed logging to
/// stderr.
pub fn init_logging(common: &CommonArgs, output_dir: &Path) -> CliResult<Option<PathBuf>> {
    let level = level_for(common.verbose);

    if common.no_log {
        init_stderr_logging(level);
        return Ok(None);
    }

    let log_dir = common
        .log_dir
        .clone()
        .unwrap_or_else(|| output_dir.join("logs"));
    fs::create_dir_all(&log_dir)
        .cli_with_context(|| format!("Failed to create log directory '{}'", log_dir.display()))?;

    let log_path = log_dir.join(log_file_name(&get_timestamp()));
    setup_file_logging(&log_path, level)
        .map_err(|e| crate::cli_error!("Failed to set up logging to '{}': {e:#}", log_path.display()))?;
    Ok(Some(log_path))
}

/// Stderr logger used by `--no-log` and by commands that never write a log file.
pub fn init_stderr_logging(level: LevelFilter) {
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    // A logger may already be installed when called from tests.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
