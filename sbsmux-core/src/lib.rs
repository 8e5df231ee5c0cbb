//! Core library converting Fuji 3D stereo recordings to side-by-side video.
//!
//! A Fuji 3D AVI carries the left and right eye as two separate video
//! streams. This crate locates both streams, decodes them in lock-step,
//! places each frame pair side by side in one double-width frame and
//! re-encodes the result with the original audio at the source frame rate.
//! Decoding and encoding go through the `MediaToolkit` trait; the shipped
//! implementation drives ffmpeg and ffprobe.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sbsmux_core::config::CoreConfigBuilder;
//! use sbsmux_core::external::FfmpegToolkit;
//! use sbsmux_core::reporting::NullReporter;
//! use std::path::{Path, PathBuf};
//!
//! let config = CoreConfigBuilder::new()
//!     .output_dir(PathBuf::from("/videos/sbs"))
//!     .crf(20)
//!     .build()
//!     .unwrap();
//! let toolkit = FfmpegToolkit::detect().unwrap();
//!
//! let result = sbsmux_core::run_batch(&toolkit, &NullReporter, &config, Path::new("/media/FUJI3D")).unwrap();
//! for job in &result.jobs {
//!     println!("{}: {:?}", job.input.display(), job.status);
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod file_logging;
pub mod processing;
pub mod reporting;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use config::{AudioMode, CoreConfig, CoreConfigBuilder};
pub use discovery::{
    find_processable_files, find_processable_files_recursive, resolve_inputs,
    resolve_inputs_recursive,
};
pub use error::{CoreError, CoreResult, FailureKind};
pub use external::{FfmpegToolkit, MediaToolkit};
pub use processing::{
    BatchResult, ConversionJob, JobFailure, JobStatus, JobSuccess, OutputDetail, SourceAsset,
    run_batch, run_stills_batch,
};
pub use utils::{format_bytes, format_duration};

use std::path::Path;

/// Converts `input` (one `.avi` file or a directory of them) into
/// `<name>_SBS.mp4` files in `output_dir`, using ffmpeg and default settings.
///
/// # Errors
///
/// Pre-flight failures only: ffmpeg or ffprobe missing, an unusable input
/// path, or no eligible files. Per-file outcomes are in the `BatchResult`.
pub fn convert(input: &Path, output_dir: &Path) -> CoreResult<BatchResult> {
    let toolkit = FfmpegToolkit::detect()?;
    let config = CoreConfig::new(output_dir.to_path_buf());
    run_batch(&toolkit, &reporting::NullReporter, &config, input)
}
