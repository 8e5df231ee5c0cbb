//! Frame-level data types flowing through the pipeline.
//!
//! Frames are packed `rgb24`: three bytes per pixel, rows stored top to
//! bottom without padding. Both eye decoders and the encoder agree on this
//! layout, so compositing is a plain byte copy.

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::fmt;

/// Bytes per pixel of the packed `rgb24` layout.
pub const BYTES_PER_PIXEL: usize = 3;

/// ffmpeg name of the raw pixel layout exchanged with the decoders and encoder.
pub const RAW_PIXEL_FORMAT: &str = "rgb24";

/// Width and height of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size in bytes of one packed frame with these dimensions.
    pub fn frame_len(&self) -> usize {
        self.row_len() * self.height as usize
    }

    pub fn row_len(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Dimensions of the side-by-side frame built from two eyes of this size.
    pub fn side_by_side(&self) -> Dimensions {
        Dimensions::new(self.width * 2, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Exact rational frame rate, e.g. 30000/1001.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Creates a reduced frame rate. Returns `None` for zero numerator or denominator.
    pub fn new(num: u32, den: u32) -> Option<Self> {
        if num == 0 || den == 0 {
            return None;
        }
        let divisor = gcd(num, den);
        Some(Self {
            num: num / divisor,
            den: den / divisor,
        })
    }

    /// Parses ffprobe's `"num/den"` or plain integer notation.
    ///
    /// `"0/0"`, empty strings and anything unparsable yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.split_once('/') {
            Some((num, den)) => Self::new(num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => Self::new(value.parse().ok()?, 1),
        }
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration in seconds of `frames` frames at this rate.
    pub fn duration_secs(&self, frames: u64) -> f64 {
        frames as f64 * f64::from(self.den) / f64::from(self.num)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// One decoded picture from a single eye stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    dimensions: Dimensions,
    data: Vec<u8>,
}

impl VideoFrame {
    /// Wraps a packed `rgb24` buffer, checking its length against the dimensions.
    pub fn from_raw(dimensions: Dimensions, data: Vec<u8>) -> CoreResult<Self> {
        if data.len() != dimensions.frame_len() {
            return Err(CoreError::Decode(format!(
                "frame buffer holds {} bytes, expected {} for {}",
                data.len(),
                dimensions.frame_len(),
                dimensions
            )));
        }
        Ok(Self { dimensions, data })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Left and right frames taken from the same decode position.
#[derive(Debug, Clone)]
pub struct FramePair {
    pub index: u64,
    pub left: VideoFrame,
    pub right: VideoFrame,
}

/// A composited double-width frame ready for the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbsFrame {
    pub index: u64,
    pub frame: VideoFrame,
}
