//! Implementation of the 'convert' subcommand.
//!
//! Validates the input, sets up logging, checks for ffmpeg/ffprobe and hands
//! the batch to sbsmux-core.

use super::{build_reporter, canonical_input, finish_batch};
use crate::cli::{AudioArg, ConvertArgs};
use crate::error::CliResult;
use crate::logging::init_logging;

use sbsmux_core::config::INPUT_EXTENSION;
use sbsmux_core::reporting::{Reporter, ReporterError};
use sbsmux_core::{AudioMode, CoreConfig, CoreConfigBuilder, FfmpegToolkit};

use log::info;

/// Maps the convert arguments onto a validated `CoreConfig`.
pub fn build_config(args: &ConvertArgs) -> CliResult<CoreConfig> {
    let audio = match args.audio {
        AudioArg::Copy => AudioMode::Copy,
        AudioArg::Aac => AudioMode::Aac {
            bitrate_kbps: args.audio_bitrate,
        },
    };
    CoreConfigBuilder::new()
        .output_dir(args.output_dir.clone())
        .crf(args.crf)
        .preset(args.preset.clone())
        .audio(audio)
        .jobs(args.common.jobs)
        .build()
}

/// Runs the convert command. `Ok(false)` means the batch ran but at least
/// one job failed.
pub fn run_convert(args: ConvertArgs) -> CliResult<bool> {
    // Discovery comes before the dependency check so path mistakes are
    // reported even on machines without ffmpeg.
    let input_path = canonical_input(&args.input_path)?;
    let inputs = sbsmux_core::resolve_inputs(&input_path, &[INPUT_EXTENSION])?;
    let config = build_config(&args)?;

    let log_path = init_logging(&args.common, &config.output_dir)?;
    if let Some(path) = &log_path {
        info!("Log file: {}", path.display());
    }
    info!("Found {} recording(s) in {}", inputs.len(), input_path.display());
    info!(
        "Encoder: {} crf {} preset {}, audio {:?}",
        config.video_codec, config.crf, config.preset, config.audio
    );

    let reporter = build_reporter(&args.common, log_path.is_some());
    let toolkit = match FfmpegToolkit::detect() {
        Ok(toolkit) => toolkit,
        Err(e) => {
            reporter.error(&ReporterError {
                title: "Missing dependency".to_string(),
                message: e.to_string(),
                context: None,
                suggestion: Some("Install ffmpeg (which ships ffprobe) and make sure both are on PATH".to_string()),
            });
            return Err(e);
        }
    };

    let result = sbsmux_core::run_batch(&toolkit, &reporter, &config, &input_path)?;
    finish_batch(&args.common, &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn convert_args(extra: &[&str]) -> ConvertArgs {
        let mut argv = vec!["sbsmux", "convert", "-i", "in", "-o", "out"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Convert(args) => args,
            other => panic!("Expected Convert command, got {other:?}"),
        }
    }

    #[test]
    fn defaults_map_to_stream_copy() {
        let config = build_config(&convert_args(&[])).unwrap();
        assert_eq!(config.audio, AudioMode::Copy);
        assert_eq!(config.crf, sbsmux_core::config::DEFAULT_CRF);
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn aac_carries_bitrate() {
        let config = build_config(&convert_args(&[
            "--audio", "aac", "--audio-bitrate", "160", "--crf", "20", "-j", "3",
        ]))
        .unwrap();
        assert_eq!(config.audio, AudioMode::Aac { bitrate_kbps: 160 });
        assert_eq!(config.crf, 20);
        assert_eq!(config.jobs, 3);
    }
}
