// ============================================================================
// sbsmux-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig. `build` validates the result instead of
// panicking on a missing output directory.

use std::path::PathBuf;

use super::{AudioMode, CoreConfig};
use crate::error::{CoreError, CoreResult};

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use sbsmux_core::config::{AudioMode, CoreConfigBuilder};
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/videos/sbs"))
///     .crf(20)
///     .preset("slow")
///     .audio(AudioMode::Aac { bitrate_kbps: 192 })
///     .jobs(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.jobs, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    output_dir: Option<PathBuf>,
    video_codec: Option<String>,
    crf: Option<u8>,
    preset: Option<String>,
    pixel_format: Option<String>,
    audio: Option<AudioMode>,
    jobs: Option<usize>,
}

impl CoreConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory where outputs are written.
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.output_dir = Some(output_dir);
        self
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into());
        self
    }

    /// Sets the constant rate factor (0-51).
    pub fn crf(mut self, crf: u8) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Sets the encoder preset (e.g. "medium", "slow").
    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn pixel_format(mut self, pixel_format: impl Into<String>) -> Self {
        self.pixel_format = Some(pixel_format.into());
        self
    }

    pub fn audio(mut self, audio: AudioMode) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Sets how many jobs may run at once.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// * `CoreError::Config` if the output directory is missing or a value is
    ///   out of range
    pub fn build(self) -> CoreResult<CoreConfig> {
        let output_dir = self
            .output_dir
            .ok_or_else(|| CoreError::Config("output directory is required".to_string()))?;

        let mut config = CoreConfig::new(output_dir);
        if let Some(codec) = self.video_codec {
            config.video_codec = codec;
        }
        if let Some(crf) = self.crf {
            config.crf = crf;
        }
        if let Some(preset) = self.preset {
            config.preset = preset;
        }
        if let Some(pixel_format) = self.pixel_format {
            config.pixel_format = pixel_format;
        }
        if let Some(audio) = self.audio {
            config.audio = audio;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }

        config.validate()?;
        Ok(config)
    }
}
