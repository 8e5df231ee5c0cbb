// sbsmux-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::builder::{PossibleValuesParser, RangedU64ValueParser};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sbsmux_core::config::{
    DEFAULT_AAC_BITRATE_KBPS, DEFAULT_CRF, DEFAULT_X264_PRESET, MAX_CRF, X264_PRESETS,
};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "sbsmux: Fuji 3D to side-by-side converter",
    long_about = "Converts Fuji 3D dual-stream AVI recordings into side-by-side MP4 files \
                  and MPO stereo stills into side-by-side JPEGs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converts Fuji 3D .avi recordings into <name>_SBS.mp4 files
    Convert(ConvertArgs),
    /// Converts MPO stereo stills into <name>_sbs.jpg files
    Stills(StillsArgs),
    /// Shows the eye streams, audio track and frame rate found in one recording
    Probe(ProbeArgs),
}

/// Audio handling for the converted video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioArg {
    /// Copy the source audio track unchanged
    Copy,
    /// Re-encode the source audio to AAC
    Aac,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Input .avi file or directory containing .avi files
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Directory where <name>_SBS.mp4 files will be saved
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// libx264 constant rate factor (0-51, lower is higher quality)
    #[arg(long, value_name = "CRF", default_value_t = DEFAULT_CRF,
          value_parser = clap::value_parser!(u8).range(0..=MAX_CRF as i64))]
    pub crf: u8,

    /// libx264 preset
    #[arg(long, value_name = "PRESET", default_value = DEFAULT_X264_PRESET,
          value_parser = PossibleValuesParser::new(X264_PRESETS.iter().copied()))]
    pub preset: String,

    /// How the source audio track is carried into the output
    #[arg(long, value_enum, default_value_t = AudioArg::Copy)]
    pub audio: AudioArg,

    /// AAC bitrate in kbit/s (only used with --audio aac)
    #[arg(long, value_name = "KBPS", default_value_t = DEFAULT_AAC_BITRATE_KBPS,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub audio_bitrate: u32,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct StillsArgs {
    /// Input .mpo/.jpg file or directory containing stereo stills
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Directory where <name>_sbs.jpg files will be saved
    #[arg(short = 'o', long = "output", required = true, value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Also convert stills in subdirectories of INPUT_PATH
    #[arg(short, long)]
    pub recursive: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Recording to inspect
    #[arg(required = true, value_name = "FILE")]
    pub file: PathBuf,

    /// Print the located source as JSON
    #[arg(long)]
    pub json: bool,
}

/// Options shared by the batch commands.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Number of files converted at once
    #[arg(short, long, value_name = "N", default_value_t = 1,
          value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub jobs: usize,

    /// Directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Do not write a log file; log to stderr instead (honours RUST_LOG)
    #[arg(long, conflicts_with = "log_dir")]
    pub no_log: bool,

    /// Emit progress as JSON lines on stdout instead of progress bars
    #[arg(long)]
    pub progress_json: bool,

    /// Print the batch result as JSON when the run finishes
    #[arg(long)]
    pub json_summary: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert_basic_args() {
        let cli = Cli::parse_from(["sbsmux", "convert", "-i", "DCIM", "-o", "sbs"]);

        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.input_path, PathBuf::from("DCIM"));
                assert_eq!(args.output_dir, PathBuf::from("sbs"));
                assert_eq!(args.crf, DEFAULT_CRF);
                assert_eq!(args.preset, "medium");
                assert_eq!(args.audio, AudioArg::Copy);
                assert_eq!(args.common.jobs, 1);
                assert!(args.common.log_dir.is_none());
                assert!(!args.common.no_log);
            }
            other => panic!("Expected Convert command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_convert_with_overrides() {
        let cli = Cli::parse_from([
            "sbsmux", "convert", "--input", "in.avi", "--output", "out",
            "--crf", "23", "--preset", "slow", "--audio", "aac", "--audio-bitrate", "128",
            "--jobs", "4", "--log-dir", "logs", "--progress-json", "--json-summary", "-v",
        ]);

        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.crf, 23);
                assert_eq!(args.preset, "slow");
                assert_eq!(args.audio, AudioArg::Aac);
                assert_eq!(args.audio_bitrate, 128);
                assert_eq!(args.common.jobs, 4);
                assert_eq!(args.common.log_dir, Some(PathBuf::from("logs")));
                assert!(args.common.progress_json);
                assert!(args.common.json_summary);
                assert!(args.common.verbose);
            }
            other => panic!("Expected Convert command, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        for bad in [
            ["--crf", "52"],
            ["--preset", "warp"],
            ["--jobs", "0"],
            ["--audio", "mp3"],
        ] {
            let args = ["sbsmux", "convert", "-i", "in", "-o", "out", bad[0], bad[1]];
            assert!(Cli::try_parse_from(args).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_no_log_conflicts_with_log_dir() {
        let result = Cli::try_parse_from([
            "sbsmux", "stills", "-i", "in", "-o", "out", "--no-log", "--log-dir", "logs",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_stills_recursive() {
        let cli = Cli::parse_from(["sbsmux", "stills", "-i", "DCIM", "-o", "sbs", "-r"]);
        match cli.command {
            Commands::Stills(args) => {
                assert!(args.recursive);
                assert_eq!(args.common.jobs, 1);
            }
            other => panic!("Expected Stills command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_probe() {
        let cli = Cli::parse_from(["sbsmux", "probe", "DSCF0001.AVI", "--json"]);
        match cli.command {
            Commands::Probe(args) => {
                assert_eq!(args.file, PathBuf::from("DSCF0001.AVI"));
                assert!(args.json);
            }
            other => panic!("Expected Probe command, got {other:?}"),
        }
    }
}
