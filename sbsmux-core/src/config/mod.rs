//! Configuration structures and constants for the sbsmux-core library.
//!
//! A `CoreConfig` value is passed explicitly into every batch invocation; the
//! library keeps no process-wide encoder or output settings of its own.

mod builder;

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::path::PathBuf;

pub use builder::CoreConfigBuilder;

// Default constants

/// Extension of Fuji 3D stereo recordings (matched case-insensitively).
pub const INPUT_EXTENSION: &str = "avi";

/// Suffix appended to the input base name to form the output file name.
pub const OUTPUT_SUFFIX: &str = "_SBS.mp4";

/// Delivery video codec for the composited stream.
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";

/// Default CRF for libx264. Lower values produce higher quality but larger files.
/// Range: 0-51.
pub const DEFAULT_CRF: u8 = 18;

/// Highest CRF accepted by libx264 for 8-bit output.
pub const MAX_CRF: u8 = 51;

/// Default libx264 preset.
pub const DEFAULT_X264_PRESET: &str = "medium";

/// Presets understood by libx264, fastest first.
pub const X264_PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

/// Output pixel format; widely playable 4:2:0.
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Bitrate used when audio is re-encoded to AAC.
pub const DEFAULT_AAC_BITRATE_KBPS: u32 = 192;

/// Extensions accepted by the stills converter.
pub const STILL_EXTENSIONS: &[&str] = &["mpo", "jpg", "jpeg"];

/// Suffix for side-by-side stills.
pub const STILL_OUTPUT_SUFFIX: &str = "_sbs.jpg";

/// JPEG quality of side-by-side stills.
pub const STILL_JPEG_QUALITY: u8 = 92;

/// How the source audio track is carried into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AudioMode {
    /// Stream copy: the output audio payload is byte-identical to the source.
    #[default]
    Copy,
    /// Re-encode to AAC for players that reject the source track.
    Aac { bitrate_kbps: u32 },
}

/// Main configuration structure for the sbsmux-core library.
///
/// Only `output_dir` has no sensible default; everything else falls back to
/// the constants above.
///
/// # Examples
///
/// ```rust
/// use sbsmux_core::config::CoreConfig;
/// use std::path::PathBuf;
///
/// let mut config = CoreConfig::new(PathBuf::from("/videos/sbs"));
/// config.crf = 20;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CoreConfig {
    /// Directory where `<name>_SBS.mp4` outputs are written (created if absent)
    pub output_dir: PathBuf,

    /// ffmpeg encoder name for the SBS video stream
    pub video_codec: String,

    /// Constant rate factor passed to the video encoder
    pub crf: u8,

    /// libx264 speed/quality preset
    pub preset: String,

    /// Pixel format of the encoded output
    pub pixel_format: String,

    /// Audio handling for sources with an audio track
    pub audio: AudioMode,

    /// Number of jobs run at once. 1 keeps the batch strictly sequential.
    pub jobs: usize,
}

impl CoreConfig {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            crf: DEFAULT_CRF,
            preset: DEFAULT_X264_PRESET.to_string(),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            audio: AudioMode::Copy,
            jobs: 1,
        }
    }

    /// Checks value ranges that the encoder would otherwise reject mid-batch.
    pub fn validate(&self) -> CoreResult<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(CoreError::Config("output directory must not be empty".to_string()));
        }
        if self.crf > MAX_CRF {
            return Err(CoreError::Config(format!(
                "CRF {} is out of range (0-{MAX_CRF})",
                self.crf
            )));
        }
        if self.video_codec == DEFAULT_VIDEO_CODEC && !X264_PRESETS.contains(&self.preset.as_str()) {
            return Err(CoreError::Config(format!(
                "unknown x264 preset '{}' (expected one of: {})",
                self.preset,
                X264_PRESETS.join(", ")
            )));
        }
        if self.jobs == 0 {
            return Err(CoreError::Config("job count must be at least 1".to_string()));
        }
        if let AudioMode::Aac { bitrate_kbps: 0 } = self.audio {
            return Err(CoreError::Config("AAC bitrate must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CoreConfig::default();
        assert_eq!(config.crf, DEFAULT_CRF);
        assert_eq!(config.preset, "medium");
        assert_eq!(config.audio, AudioMode::Copy);
        assert_eq!(config.jobs, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = CoreConfig::default();
        config.crf = 52;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let mut config = CoreConfig::default();
        config.preset = "warp".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("warp"));

        let mut config = CoreConfig::default();
        config.jobs = 0;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.audio = AudioMode::Aac { bitrate_kbps: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn custom_codec_skips_preset_check() {
        let mut config = CoreConfig::default();
        config.video_codec = "libx265".to_string();
        config.preset = "anything".to_string();
        assert!(config.validate().is_ok());
    }
}
