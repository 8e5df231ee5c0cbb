//! Lock-step decoding of the two eye streams into frame pairs.
//!
//! `FramePairs` is a finite, non-restartable iterator. Each step pulls one
//! frame from the left decoder and one from the right decoder. When either
//! stream ends the sequence ends, so the longer stream's surplus frames are
//! never decoded into pairs. The first decode error is yielded once and the
//! iterator is exhausted afterwards.

use crate::error::{CoreError, CoreResult, FailureKind};
use crate::external::{EyeDecoder, MediaToolkit};
use crate::processing::frame::{FramePair, VideoFrame};
use crate::processing::locator::SourceAsset;

use std::iter::FusedIterator;

/// Synchronized (left, right) frame sequence for one source.
pub struct FramePairs<D: EyeDecoder> {
    left: D,
    right: D,
    next_index: u64,
    done: bool,
}

impl<D: EyeDecoder> FramePairs<D> {
    pub fn new(left: D, right: D) -> Self {
        Self {
            left,
            right,
            next_index: 0,
            done: false,
        }
    }

    /// Opens both eye decoders for `asset` through `toolkit`.
    pub fn open<T>(toolkit: &T, asset: &SourceAsset) -> CoreResult<Self>
    where
        T: MediaToolkit<Decoder = D> + ?Sized,
    {
        let open = |stream: usize| {
            toolkit
                .open_decoder(&asset.path, stream, asset.eye_dimensions)
                .map_err(|e| e.in_stage(FailureKind::Decode))
        };
        let left = open(asset.left_stream)?;
        let right = open(asset.right_stream)?;
        Ok(Self::new(left, right))
    }

    /// Number of pairs yielded so far.
    pub fn pairs_emitted(&self) -> u64 {
        self.next_index
    }

    fn decode_eye(decoder: &mut D, eye: &str, index: u64) -> CoreResult<Option<VideoFrame>> {
        decoder.decode_frame().map_err(|e| match e.in_stage(FailureKind::Decode) {
            CoreError::Decode(msg) => CoreError::Decode(format!("{eye} eye, pair {index}: {msg}")),
            other => other,
        })
    }
}

impl<D: EyeDecoder> Iterator for FramePairs<D> {
    type Item = CoreResult<FramePair>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let index = self.next_index;

        let left = match Self::decode_eye(&mut self.left, "left", index) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        let right = match Self::decode_eye(&mut self.right, "right", index) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        self.next_index += 1;
        Some(Ok(FramePair { index, left, right }))
    }
}

impl<D: EyeDecoder> FusedIterator for FramePairs<D> {}
