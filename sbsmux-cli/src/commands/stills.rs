//! Implementation of the 'stills' subcommand.
//!
//! MPO stills are split and re-encoded in-process, so no external tools are
//! required.

use super::{build_reporter, canonical_input, finish_batch};
use crate::cli::StillsArgs;
use crate::error::CliResult;
use crate::logging::init_logging;

use sbsmux_core::CoreConfigBuilder;

use log::info;

pub fn run_stills(args: StillsArgs) -> CliResult<bool> {
    let input_path = canonical_input(&args.input_path)?;
    let config = CoreConfigBuilder::new()
        .output_dir(args.output_dir.clone())
        .jobs(args.common.jobs)
        .build()?;

    let log_path = init_logging(&args.common, &config.output_dir)?;
    if let Some(path) = &log_path {
        info!("Log file: {}", path.display());
    }
    info!(
        "Converting stereo stills from {}{}",
        input_path.display(),
        if args.recursive { " (including subdirectories)" } else { "" }
    );

    let reporter = build_reporter(&args.common, log_path.is_some());
    let result = sbsmux_core::run_stills_batch(&reporter, &config, &input_path, args.recursive)?;
    finish_batch(&args.common, &result)
}
