//! Utility functions for formatting and path handling.
//!
//! This module provides general-purpose helpers used throughout the
//! sbsmux-core library: duration and byte formatting, extension matching and
//! output name derivation.

use crate::error::{CoreError, CoreResult};
use std::path::Path;

/// Checks whether `path` ends in one of `extensions` (case-insensitive, no leading dot).
#[must_use]
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Derives an output file name from the input's base name, e.g.
/// `DSCF0001.AVI` + `_SBS.mp4` -> `DSCF0001_SBS.mp4`.
pub fn output_file_name(input: &Path, suffix: &str) -> CoreResult<String> {
    let stem = input
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            CoreError::PathError(format!("Failed to get file stem for {}", input.display()))
        })?;
    Ok(format!("{}{}", stem.to_string_lossy(), suffix))
}

/// Formats seconds as HH:MM:SS (e.g., 3725.0 -> "01:02:05"). Returns "??:??:??" for invalid inputs.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??".to_string();
    }

    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Formats bytes with appropriate binary units (B, KiB, MiB, GiB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Extracts the file name of a path for display.
pub fn get_filename_safe(path: &Path) -> CoreResult<String> {
    Ok(path
        .file_name()
        .ok_or_else(|| {
            CoreError::PathError(format!("Failed to get filename for {}", path.display()))
        })?
        .to_string_lossy()
        .to_string())
}
