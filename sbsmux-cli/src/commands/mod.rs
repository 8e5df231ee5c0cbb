//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command; the
//! helpers here are shared by the batch commands.

/// Module containing the implementation of the `convert` command.
pub mod convert;
/// Module containing the implementation of the `probe` command.
pub mod probe;
/// Module containing the implementation of the `stills` command.
pub mod stills;

use crate::cli::CommonArgs;
use crate::error::CliResult;

use sbsmux_core::file_logging::LogReporter;
use sbsmux_core::reporting::{JsonReporter, MultiReporter, Reporter, TerminalReporter};
use sbsmux_core::{BatchResult, CoreError};

use std::path::{Path, PathBuf};

/// Resolves the user-supplied input to an absolute path.
pub fn canonical_input(input: &Path) -> CliResult<PathBuf> {
    input.canonicalize().map_err(|e| {
        CoreError::PathError(format!("Invalid input path '{}': {}", input.display(), e))
    })
}

/// Builds the reporter stack for a batch run: progress bars or JSON lines on
/// stdout, plus the log file when one is active.
pub fn build_reporter(common: &CommonArgs, file_logging: bool) -> MultiReporter {
    let mut reporters: Vec<Box<dyn Reporter>> = Vec::new();
    if common.progress_json {
        reporters.push(Box::new(JsonReporter::new()));
    } else {
        reporters.push(Box::new(TerminalReporter::new()));
    }
    if file_logging {
        reporters.push(Box::new(LogReporter::new()));
    }
    MultiReporter::new(reporters)
}

/// Prints the optional JSON summary and reports whether every job succeeded.
pub fn finish_batch(common: &CommonArgs, result: &BatchResult) -> CliResult<bool> {
    if common.json_summary {
        let json = serde_json::to_string(result)
            .map_err(|e| crate::cli_error!("Failed to serialize batch result: {e}"))?;
        println!("{json}");
    }
    Ok(result.all_succeeded())
}
