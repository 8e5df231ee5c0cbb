//! FFprobe integration for container inspection.
//!
//! Runs ffprobe through the `ffprobe` crate and converts its JSON model into
//! the toolkit's `ContainerProbe`, keeping only what the stream locator needs.
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::external::{ContainerProbe, StreamInfo, StreamKind};
use crate::processing::frame::{Dimensions, FrameRate};
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Probes every stream of the container at `input_path`.
pub fn probe_container(input_path: &Path) -> CoreResult<ContainerProbe> {
    log::debug!(
        "Running ffprobe (via crate) for stream layout on: {}",
        input_path.display()
    );
    match ffprobe(input_path) {
        Ok(metadata) => {
            let streams = metadata
                .streams
                .iter()
                .filter_map(|stream| {
                    let index = usize::try_from(stream.index).ok()?;
                    Some(StreamInfo {
                        index,
                        kind: stream_kind(stream.codec_type.as_deref()),
                        codec_name: stream.codec_name.clone(),
                        dimensions: dimensions(stream.width, stream.height),
                        frame_rate: FrameRate::parse(&stream.r_frame_rate)
                            .or_else(|| FrameRate::parse(&stream.avg_frame_rate)),
                        frame_count: stream
                            .nb_frames
                            .as_deref()
                            .and_then(|n| n.parse::<u64>().ok()),
                    })
                })
                .collect();
            Ok(ContainerProbe { streams })
        }
        Err(err) => {
            log::error!(
                "ffprobe failed for stream layout on {}: {:?}",
                input_path.display(),
                err
            );
            Err(map_ffprobe_error(err, "stream layout"))
        }
    }
}

fn stream_kind(codec_type: Option<&str>) -> StreamKind {
    match codec_type {
        Some("video") => StreamKind::Video,
        Some("audio") => StreamKind::Audio,
        _ => StreamKind::Other,
    }
}

fn dimensions(width: Option<i64>, height: Option<i64>) -> Option<Dimensions> {
    let width = u32::try_from(width?).ok()?;
    let height = u32::try_from(height?).ok()?;
    Some(Dimensions::new(width, height))
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => CoreError::JsonParseError(format!(
            "ffprobe {context} output deserialization: {err}"
        )),
        #[allow(unreachable_patterns)]
        _ => CoreError::Probe(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}
