//! Input discovery for batch runs.
//!
//! By default only the top level of a directory is searched. The recursive
//! variants also descend into subdirectories (symlinked directories are not
//! followed). Matching is by extension, case-insensitively, and results are
//! returned in lexicographic path order so batches are reproducible.

use crate::error::{CoreError, CoreResult};
use crate::utils::has_extension;

use std::path::{Path, PathBuf};

/// Finds files with one of `extensions` in the top level of `input_dir`.
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - the matching files, sorted
/// * `Err(CoreError::Io)` - the directory could not be read
/// * `Err(CoreError::NoFilesFound)` - nothing matched
///
/// # Examples
///
/// ```rust,no_run
/// use sbsmux_core::find_processable_files;
/// use std::path::Path;
///
/// let files = find_processable_files(Path::new("/media/FUJI3D"), &["avi"]).unwrap();
/// for file in files {
///     println!("  {}", file.display());
/// }
/// ```
pub fn find_processable_files(input_dir: &Path, extensions: &[&str]) -> CoreResult<Vec<PathBuf>> {
    find_files(input_dir, extensions, false)
}

/// Like [`find_processable_files`], but also searches every subdirectory.
pub fn find_processable_files_recursive(
    input_dir: &Path,
    extensions: &[&str],
) -> CoreResult<Vec<PathBuf>> {
    find_files(input_dir, extensions, true)
}

fn find_files(input_dir: &Path, extensions: &[&str], recursive: bool) -> CoreResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(input_dir, extensions, recursive, &mut files)?;
    files.sort();

    if files.is_empty() {
        Err(CoreError::NoFilesFound)
    } else {
        Ok(files)
    }
}

fn collect_files(
    dir: &Path,
    extensions: &[&str],
    recursive: bool,
    files: &mut Vec<PathBuf>,
) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir)?.filter_map(Result::ok) {
        let path = entry.path();
        let is_real_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        if is_real_dir {
            if recursive {
                collect_files(&path, extensions, recursive, files)?;
            }
        } else if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    Ok(())
}

/// Resolves a batch input: a single eligible file, or the eligible files of a directory.
///
/// # Errors
///
/// * `CoreError::PathError` - the path does not exist, or is a file without
///   an eligible extension
/// * `CoreError::NoFilesFound` - a directory with no eligible files
pub fn resolve_inputs(input: &Path, extensions: &[&str]) -> CoreResult<Vec<PathBuf>> {
    resolve(input, extensions, false)
}

/// Like [`resolve_inputs`], but a directory input is searched recursively.
pub fn resolve_inputs_recursive(input: &Path, extensions: &[&str]) -> CoreResult<Vec<PathBuf>> {
    resolve(input, extensions, true)
}

fn resolve(input: &Path, extensions: &[&str], recursive: bool) -> CoreResult<Vec<PathBuf>> {
    if input.is_dir() {
        return find_files(input, extensions, recursive);
    }
    if input.is_file() {
        if has_extension(input, extensions) {
            return Ok(vec![input.to_path_buf()]);
        }
        return Err(CoreError::PathError(format!(
            "Unsupported input file {} (expected .{})",
            input.display(),
            extensions.join(", .")
        )));
    }
    Err(CoreError::PathError(format!(
        "Input path not found: {}",
        input.display()
    )))
}
