// sbsmux-cli/src/lib.rs
//
// Library portion of the sbsmux CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// Used by `cli_error!` expansions.
pub use sbsmux_core;

// Re-export items needed by the binary or integration tests
pub use cli::{AudioArg, Cli, Commands, CommonArgs, ConvertArgs, ProbeArgs, StillsArgs};
pub use commands::convert::run_convert;
pub use commands::probe::run_probe;
pub use commands::stills::run_stills;
pub use error::{CliErrorContext, CliResult};
