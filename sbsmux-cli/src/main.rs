// sbsmux-cli/src/main.rs
//
// Entry point for the sbsmux binary: parses arguments, dispatches to the
// subcommand and maps the outcome onto the process exit code.
//
// Exit codes: 0 when every job succeeded, 1 when any job failed or the run
// could not start, 2 for argument errors (reported by clap).

use clap::Parser;
use console::style;
use log::{LevelFilter, error};
use sbsmux::logging::init_stderr_logging;
use sbsmux::{Cli, Commands, run_convert, run_probe, run_stills};
use std::process;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert(args) => run_convert(args),
        Commands::Stills(args) => run_stills(args),
        Commands::Probe(args) => {
            init_stderr_logging(LevelFilter::Warn);
            run_probe(args).map(|()| true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{e}");
            eprintln!("{} {}", style("Error:").red().bold(), e);
            process::exit(1);
        }
    }
}
