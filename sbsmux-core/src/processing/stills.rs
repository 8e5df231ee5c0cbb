//! MPO stereo stills to side-by-side JPEGs.
//!
//! Fuji 3D cameras store a stereo photo as an MPO: two complete JPEG images
//! back to back in one file. The left image starts at the beginning of the
//! file; the right image is found by scanning for the second JPEG start
//! (SOI followed by an APP1 or APP0 marker) and runs to the third such
//! marker or to the end of the file.
//!
//! Both halves are decoded with the `image` crate, composited with the same
//! compositor as the video path and written as a quality-92 JPEG.

use crate::config::{CoreConfig, STILL_EXTENSIONS, STILL_JPEG_QUALITY, STILL_OUTPUT_SUFFIX};
use crate::discovery::{resolve_inputs, resolve_inputs_recursive};
use crate::error::{CoreError, CoreResult};
use crate::processing::batch::{BatchResult, OutputDetail, run_jobs};
use crate::processing::compositor::compose_frames;
use crate::processing::frame::{Dimensions, VideoFrame};
use crate::reporting::Reporter;
use crate::temp_files::{create_staging_path, persist_staging};
use crate::utils::output_file_name;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat};
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

const SOI_APP1: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE1];
const SOI_APP0: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

/// Returns the byte range of the second image embedded in an MPO buffer.
pub fn find_second_image(data: &[u8]) -> CoreResult<Range<usize>> {
    let mut offsets = Vec::with_capacity(3);
    let mut i = 0;
    while i + 4 <= data.len() && offsets.len() < 3 {
        let window = &data[i..i + 4];
        if window == SOI_APP1 || window == SOI_APP0 {
            offsets.push(i);
            i += 4;
        } else {
            i += 1;
        }
    }

    match offsets.as_slice() {
        [_, start, end] => Ok(*start..*end),
        [_, start] => Ok(*start..data.len()),
        _ => Err(CoreError::StillImage(
            "could not find two embedded JPEG images".to_string(),
        )),
    }
}

fn decode_jpeg(bytes: &[u8], eye: &str) -> CoreResult<VideoFrame> {
    let rgb = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| CoreError::StillImage(format!("failed to decode {eye} image: {e}")))?
        .to_rgb8();
    let dimensions = Dimensions::new(rgb.width(), rgb.height());
    VideoFrame::from_raw(dimensions, rgb.into_raw())
        .map_err(|e| CoreError::StillImage(format!("{eye} image: {e}")))
}

/// Converts one MPO file into a side-by-side JPEG at `output`.
///
/// Returns the size of the written image.
pub fn convert_still(input: &Path, output: &Path) -> CoreResult<Dimensions> {
    let data = std::fs::read(input)?;
    let right_range = find_second_image(&data)?;

    let left = decode_jpeg(&data[..right_range.start], "left")?;
    let right = decode_jpeg(&data[right_range], "right")?;
    if left.dimensions() != right.dimensions() {
        return Err(CoreError::StillImage(format!(
            "eye images differ in size: left {}, right {}",
            left.dimensions(),
            right.dimensions()
        )));
    }

    let sbs = compose_frames(&left, &right);
    let dims = sbs.dimensions();

    let output_dir = output.parent().unwrap_or_else(|| Path::new("."));
    let final_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CoreError::PathError(format!("Output path has no file name: {}", output.display())))?;
    let staging = create_staging_path(output_dir, &final_name)?;

    let mut writer = BufWriter::new(std::fs::File::create(&staging)?);
    JpegEncoder::new_with_quality(&mut writer, STILL_JPEG_QUALITY)
        .encode(sbs.data(), dims.width, dims.height, ExtendedColorType::Rgb8)
        .map_err(|e| CoreError::StillImage(format!("failed to encode JPEG: {e}")))?;
    writer.flush()?;
    drop(writer);

    persist_staging(staging, output)?;
    log::debug!("Wrote {} ({})", output.display(), dims);
    Ok(dims)
}

/// Converts every MPO/JPEG still found at `input` into a side-by-side JPEG.
///
/// Uses the same job planning, collision checks and failure isolation as the
/// video batch. Files that already carry the output suffix are skipped so a
/// batch can write into its own input directory. With `recursive`, stills in
/// subdirectories are included; all outputs still land flat in the output
/// directory, so equal names from different folders are path conflicts.
pub fn run_stills_batch(
    reporter: &dyn Reporter,
    config: &CoreConfig,
    input: &Path,
    recursive: bool,
) -> CoreResult<BatchResult> {
    let found = if recursive {
        resolve_inputs_recursive(input, STILL_EXTENSIONS)?
    } else {
        resolve_inputs(input, STILL_EXTENSIONS)?
    };
    let inputs: Vec<_> = found
        .into_iter()
        .filter(|p| !is_previous_output(p))
        .collect();
    if inputs.is_empty() {
        return Err(CoreError::NoFilesFound);
    }

    run_jobs(
        config,
        reporter,
        inputs,
        |path| output_file_name(path, STILL_OUTPUT_SUFFIX),
        |job| {
            convert_still(&job.input, &job.output)
                .map(|dimensions| OutputDetail::Still { dimensions })
        },
    )
}

fn is_previous_output(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().ends_with(STILL_OUTPUT_SUFFIX))
        .unwrap_or(false)
}
