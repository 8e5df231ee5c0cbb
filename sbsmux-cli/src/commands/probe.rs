//! Implementation of the 'probe' subcommand: locate the eye streams of one
//! recording and print what a conversion would use.

use super::canonical_input;
use crate::cli::ProbeArgs;
use crate::error::CliResult;

use sbsmux_core::processing::{SourceAsset, locate};
use sbsmux_core::FfmpegToolkit;

use console::style;

pub fn run_probe(args: ProbeArgs) -> CliResult<()> {
    let path = canonical_input(&args.file)?;
    if !path.is_file() {
        return Err(crate::cli_error!("'{}' is not a file", args.file.display()));
    }

    let toolkit = FfmpegToolkit::detect()?;
    let asset = locate(&toolkit, &path)?;

    if args.json {
        let json = serde_json::to_string_pretty(&asset)
            .map_err(|e| crate::cli_error!("Failed to serialize probe result: {e}"))?;
        println!("{json}");
    } else {
        for (label, value) in describe(&asset) {
            println!("  {:<14} {}", style(format!("{label}:")).bold(), value);
        }
    }
    Ok(())
}

fn frames(count: Option<u64>) -> String {
    count.map_or_else(|| "unknown".to_string(), |n| format!("{n} frames"))
}

/// Label/value rows shown for a located source.
pub fn describe(asset: &SourceAsset) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("File", asset.path.display().to_string()),
        (
            "Left eye",
            format!("stream {} ({})", asset.left_stream, frames(asset.left_frame_count)),
        ),
        (
            "Right eye",
            format!("stream {} ({})", asset.right_stream, frames(asset.right_frame_count)),
        ),
        (
            "Audio",
            asset
                .audio_stream
                .map_or_else(|| "none".to_string(), |i| format!("stream {i}")),
        ),
        ("Frame rate", asset.frame_rate.to_string()),
        ("Eye size", asset.eye_dimensions.to_string()),
        ("Output size", asset.sbs_dimensions().to_string()),
        ("Frame pairs", frames(asset.frame_count)),
    ];
    if let Some(surplus) = asset.surplus_frames().filter(|n| *n > 0) {
        rows.push(("Dropped", format!("{surplus} unpaired frame(s)")));
    }
    rows
}
