//! Staging file management for outputs.
//!
//! Outputs are written to a hidden staging file next to their final location
//! and renamed into place only once complete. The staging file is a
//! `tempfile::TempPath`, so any early return or panic removes it through
//! `Drop` and no partial output is ever left under the final name.

use crate::error::{CoreError, CoreResult};
use std::path::Path;
use tempfile::{Builder as TempFileBuilder, TempPath};

/// Creates an empty staging file in `dir` for the output named `final_name`.
///
/// The file is named `.<final stem>.<random>.<extension>` so it sorts next to
/// the output, is hidden on Unix, and keeps the extension ffmpeg uses to pick
/// a muxer.
pub fn create_staging_path(dir: &Path, final_name: &str) -> CoreResult<TempPath> {
    std::fs::create_dir_all(dir)?;
    let (stem, extension) = match final_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (final_name, String::new()),
    };
    let staging = TempFileBuilder::new()
        .prefix(&format!(".{stem}."))
        .suffix(&extension)
        .tempfile_in(dir)?;
    Ok(staging.into_temp_path())
}

/// Moves a finished staging file to its final path, replacing any previous output.
pub fn persist_staging(staging: TempPath, final_path: &Path) -> CoreResult<()> {
    staging.persist(final_path).map_err(|e| {
        CoreError::PathError(format!(
            "Failed to move finished output to {}: {}",
            final_path.display(),
            e.error
        ))
    })
}
