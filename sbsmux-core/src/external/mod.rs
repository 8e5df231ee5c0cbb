// ============================================================================
// sbsmux-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: The Decode/Encode Capability Seam
//
// The pipeline never talks to ffmpeg directly. It depends on the narrow
// `MediaToolkit` capability defined here: probe a container, open a
// per-stream frame decoder, open an encoder that muxes composited frames with
// the source audio. `FfmpegToolkit` implements it with ffprobe and
// ffmpeg-sidecar; tests substitute an in-memory implementation.
//
// KEY COMPONENTS:
// - ContainerProbe / StreamInfo: what a probe reports about each stream
// - EyeDecoder: lock-step frame source for one eye stream
// - SbsEncoder: consumer of composited frames that finalizes one output
// - MediaToolkit: factory tying the three operations together
// - check_dependency: pre-flight check for the ffmpeg/ffprobe executables

use crate::config::{AudioMode, CoreConfig};
use crate::error::{CoreError, CoreResult};
use crate::processing::frame::{Dimensions, FrameRate, SbsFrame, VideoFrame};

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// ffmpeg-sidecar backed decoders and encoder
pub mod ffmpeg_executor;

/// ffprobe crate backed container probing
pub mod ffprobe_executor;

pub use ffmpeg_executor::{FfmpegToolkit, SidecarDecoder, SidecarEncoder};
pub use ffprobe_executor::probe_container;

// ============================================================================
// PROBE RESULTS
// ============================================================================

/// Kind of an elementary stream inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamKind {
    Video,
    Audio,
    Other,
}

/// One elementary stream as reported by a probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamInfo {
    /// Absolute stream index within the container
    pub index: usize,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
    /// Picture size; `None` for non-video streams or when unreported
    pub dimensions: Option<Dimensions>,
    /// Frame rate; `None` when unreported or zero
    pub frame_rate: Option<FrameRate>,
    /// Frame count from the container index, when the container records one
    pub frame_count: Option<u64>,
}

/// Everything a probe reports about one container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerProbe {
    pub streams: Vec<StreamInfo>,
}

impl ContainerProbe {
    /// Video streams in container order.
    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Video)
    }

    /// Audio streams in container order.
    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Audio)
    }
}

// ============================================================================
// DECODE / ENCODE CAPABILITY
// ============================================================================

/// Sequential frame source for one eye stream.
pub trait EyeDecoder {
    /// Returns the next decoded frame, or `None` at end of stream.
    ///
    /// After `None` or an error the decoder is exhausted.
    fn decode_frame(&mut self) -> CoreResult<Option<VideoFrame>>;
}

/// Consumer of composited frames that produces one output file.
pub trait SbsEncoder {
    fn write_frame(&mut self, frame: &SbsFrame) -> CoreResult<()>;

    /// Flushes the encoder and finalizes the container.
    fn finish(self) -> CoreResult<()>;

    /// Stops encoding without finalizing. The output file may be left partial.
    fn abort(self);
}

/// Source audio stream to carry into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub path: PathBuf,
    pub stream_index: usize,
}

/// Encoder parameters taken from the batch configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub video_codec: String,
    pub crf: u8,
    pub preset: String,
    pub pixel_format: String,
    pub audio_mode: AudioMode,
}

impl From<&CoreConfig> for EncoderSettings {
    fn from(config: &CoreConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            crf: config.crf,
            preset: config.preset.clone(),
            pixel_format: config.pixel_format.clone(),
            audio_mode: config.audio,
        }
    }
}

/// Everything an encoder needs to produce one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    /// Where the encoder writes; the sink later moves it to the final name
    pub output_path: PathBuf,
    /// Size of every frame passed to `write_frame`
    pub dimensions: Dimensions,
    pub frame_rate: FrameRate,
    pub audio: Option<AudioSource>,
    pub settings: EncoderSettings,
}

/// The external media-processing capability the pipeline depends on.
pub trait MediaToolkit {
    type Decoder: EyeDecoder;
    type Encoder: SbsEncoder;

    /// Lists the streams of a container.
    fn probe(&self, path: &Path) -> CoreResult<ContainerProbe>;

    /// Opens a decoder for one video stream producing frames of `dimensions`.
    fn open_decoder(
        &self,
        path: &Path,
        stream_index: usize,
        dimensions: Dimensions,
    ) -> CoreResult<Self::Decoder>;

    fn open_encoder(&self, request: &EncodeRequest) -> CoreResult<Self::Encoder>;
}

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks that an external command exists by running it with `-version`.
///
/// # Errors
///
/// * `CoreError::DependencyNotFound` - the executable is not on PATH
/// * `CoreError::CommandStart` - it exists but could not be started
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found.");
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{cmd_name}': {e}");
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}
