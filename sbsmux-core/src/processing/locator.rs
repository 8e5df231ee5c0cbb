// ============================================================================
// sbsmux-core/src/processing/locator.rs
// ============================================================================
//
// STREAM LOCATOR: Identify the Eye Streams of a Fuji 3D Container
//
// Fuji 3D recordings carry two video tracks: the first (by container index)
// is the left eye, the second the right eye. No image analysis is done to
// confirm this; the ordering is a precondition of the input format.
//
// The frame rate and per-eye size found here are authoritative for the whole
// pipeline, so both eye streams must agree on them.

use crate::error::{CoreError, CoreResult, FailureKind};
use crate::external::{MediaToolkit, StreamInfo};
use crate::processing::frame::{Dimensions, FrameRate};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Immutable description of one probed source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceAsset {
    pub path: PathBuf,
    /// Container index of the left-eye video stream
    pub left_stream: usize,
    /// Container index of the right-eye video stream
    pub right_stream: usize,
    /// Container index of the selected audio stream, if any
    pub audio_stream: Option<usize>,
    pub frame_rate: FrameRate,
    pub eye_dimensions: Dimensions,
    /// Pairs expected from the container index, `min(left, right)`
    pub frame_count: Option<u64>,
    pub left_frame_count: Option<u64>,
    pub right_frame_count: Option<u64>,
}

impl SourceAsset {
    /// Size of the composited side-by-side frame.
    pub fn sbs_dimensions(&self) -> Dimensions {
        self.eye_dimensions.side_by_side()
    }

    /// Frames the longer eye stream carries beyond the shorter one, when known.
    pub fn surplus_frames(&self) -> Option<u64> {
        Some(self.left_frame_count?.abs_diff(self.right_frame_count?))
    }
}

/// Probes `path` and identifies its eye and audio streams.
///
/// # Errors
///
/// Always `CoreError::Probe`: the probe itself failed, fewer than two video
/// streams exist, or the two eye streams report zero or differing frame rate
/// or dimensions.
pub fn locate<T: MediaToolkit + ?Sized>(toolkit: &T, path: &Path) -> CoreResult<SourceAsset> {
    let probe = toolkit
        .probe(path)
        .map_err(|e| e.in_stage(FailureKind::Probe))?;

    let mut video = probe.video_streams();
    let (left, right) = match (video.next(), video.next()) {
        (Some(left), Some(right)) => (left, right),
        _ => {
            let found = probe.video_streams().count();
            return Err(CoreError::Probe(format!(
                "{} has {} video stream(s); a Fuji 3D recording needs two",
                path.display(),
                found
            )));
        }
    };
    let extra = probe.video_streams().count().saturating_sub(2);
    if extra > 0 {
        log::warn!(
            "{}: ignoring {} video stream(s) after the first two",
            path.display(),
            extra
        );
    }

    let frame_rate = matching_frame_rate(left, right)?;
    let eye_dimensions = matching_dimensions(left, right)?;

    let mut audio = probe.audio_streams();
    let audio_stream = audio.next().map(|s| s.index);
    let skipped_audio = audio.count();
    if skipped_audio > 0 {
        log::info!(
            "{}: using audio stream {} and ignoring {} other(s)",
            path.display(),
            audio_stream.unwrap_or_default(),
            skipped_audio
        );
    }

    let frame_count = match (left.frame_count, right.frame_count) {
        (Some(l), Some(r)) => Some(l.min(r)),
        _ => None,
    };

    let asset = SourceAsset {
        path: path.to_path_buf(),
        left_stream: left.index,
        right_stream: right.index,
        audio_stream,
        frame_rate,
        eye_dimensions,
        frame_count,
        left_frame_count: left.frame_count,
        right_frame_count: right.frame_count,
    };
    log::debug!("Located streams for {}: {:?}", path.display(), asset);
    Ok(asset)
}

fn matching_frame_rate(left: &StreamInfo, right: &StreamInfo) -> CoreResult<FrameRate> {
    match (left.frame_rate, right.frame_rate) {
        (Some(l), Some(r)) if l == r => Ok(l),
        (Some(l), Some(r)) => Err(CoreError::Probe(format!(
            "eye streams disagree on frame rate: left {l}, right {r}"
        ))),
        _ => Err(CoreError::Probe(format!(
            "eye stream reports no usable frame rate (left stream {}, right stream {})",
            left.index, right.index
        ))),
    }
}

fn matching_dimensions(left: &StreamInfo, right: &StreamInfo) -> CoreResult<Dimensions> {
    match (left.dimensions, right.dimensions) {
        (Some(l), _) if l.is_empty() => Err(CoreError::Probe(format!(
            "left eye stream has zero dimensions ({l})"
        ))),
        (Some(l), _) if l.width.checked_mul(2).is_none() => Err(CoreError::Probe(format!(
            "eye width {} is too large for a side-by-side frame",
            l.width
        ))),
        (Some(l), Some(r)) if l == r => Ok(l),
        (Some(l), Some(r)) => Err(CoreError::Probe(format!(
            "eye streams disagree on dimensions: left {l}, right {r}"
        ))),
        _ => Err(CoreError::Probe(format!(
            "eye stream reports no dimensions (left stream {}, right stream {})",
            left.index, right.index
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{
        ContainerProbe, EncodeRequest, EyeDecoder, SbsEncoder, StreamKind,
    };
    use crate::processing::frame::{SbsFrame, VideoFrame};

    struct ProbeOnly(CoreResult<ContainerProbe>);

    struct NoDecoder;
    impl EyeDecoder for NoDecoder {
        fn decode_frame(&mut self) -> CoreResult<Option<VideoFrame>> {
            Ok(None)
        }
    }

    struct NoEncoder;
    impl SbsEncoder for NoEncoder {
        fn write_frame(&mut self, _frame: &SbsFrame) -> CoreResult<()> {
            Ok(())
        }
        fn finish(self) -> CoreResult<()> {
            Ok(())
        }
        fn abort(self) {}
    }

    impl MediaToolkit for ProbeOnly {
        type Decoder = NoDecoder;
        type Encoder = NoEncoder;

        fn probe(&self, _path: &Path) -> CoreResult<ContainerProbe> {
            match &self.0 {
                Ok(probe) => Ok(probe.clone()),
                Err(e) => Err(CoreError::OperationFailed(e.to_string())),
            }
        }
        fn open_decoder(&self, _: &Path, _: usize, _: Dimensions) -> CoreResult<NoDecoder> {
            Ok(NoDecoder)
        }
        fn open_encoder(&self, _: &EncodeRequest) -> CoreResult<NoEncoder> {
            Ok(NoEncoder)
        }
    }

    fn video(index: usize, rate: &str, w: u32, h: u32, frames: Option<u64>) -> StreamInfo {
        StreamInfo {
            index,
            kind: StreamKind::Video,
            codec_name: Some("mjpeg".into()),
            dimensions: Some(Dimensions::new(w, h)),
            frame_rate: FrameRate::parse(rate),
            frame_count: frames,
        }
    }

    fn audio(index: usize) -> StreamInfo {
        StreamInfo {
            index,
            kind: StreamKind::Audio,
            codec_name: Some("pcm_s16le".into()),
            dimensions: None,
            frame_rate: None,
            frame_count: None,
        }
    }

    fn locate_streams(streams: Vec<StreamInfo>) -> CoreResult<SourceAsset> {
        let toolkit = ProbeOnly(Ok(ContainerProbe { streams }));
        locate(&toolkit, Path::new("DSCF0001.AVI"))
    }

    #[test]
    fn first_video_is_left_second_is_right() {
        let asset = locate_streams(vec![
            video(0, "30/1", 640, 480, Some(120)),
            audio(1),
            video(2, "30/1", 640, 480, Some(118)),
        ])
        .unwrap();
        assert_eq!(asset.left_stream, 0);
        assert_eq!(asset.right_stream, 2);
        assert_eq!(asset.audio_stream, Some(1));
        assert_eq!(asset.frame_count, Some(118));
        assert_eq!(asset.surplus_frames(), Some(2));
        assert_eq!(asset.sbs_dimensions(), Dimensions::new(1280, 480));
    }

    #[test]
    fn first_of_several_audio_streams_is_selected() {
        let asset = locate_streams(vec![
            video(0, "30/1", 640, 480, None),
            video(1, "30/1", 640, 480, None),
            audio(2),
            audio(3),
        ])
        .unwrap();
        assert_eq!(asset.audio_stream, Some(2));
        assert_eq!(asset.frame_count, None);
    }

    #[test]
    fn no_audio_is_not_an_error() {
        let asset = locate_streams(vec![
            video(0, "24000/1001", 320, 240, None),
            video(1, "24000/1001", 320, 240, None),
        ])
        .unwrap();
        assert_eq!(asset.audio_stream, None);
    }

    #[test]
    fn single_video_stream_is_a_probe_error() {
        let err = locate_streams(vec![video(0, "30/1", 640, 480, None), audio(1)]).unwrap_err();
        assert!(matches!(err, CoreError::Probe(ref m) if m.contains("1 video stream")));
    }

    #[test]
    fn inconsistent_streams_are_probe_errors() {
        let rate = locate_streams(vec![
            video(0, "30/1", 640, 480, None),
            video(1, "25/1", 640, 480, None),
        ]);
        assert_eq!(rate.unwrap_err().failure_kind(), FailureKind::Probe);

        let zero_rate = locate_streams(vec![
            video(0, "0/0", 640, 480, None),
            video(1, "0/0", 640, 480, None),
        ]);
        assert_eq!(zero_rate.unwrap_err().failure_kind(), FailureKind::Probe);

        let dims = locate_streams(vec![
            video(0, "30/1", 640, 480, None),
            video(1, "30/1", 640, 360, None),
        ]);
        assert_eq!(dims.unwrap_err().failure_kind(), FailureKind::Probe);

        let zero_dims = locate_streams(vec![
            video(0, "30/1", 0, 0, None),
            video(1, "30/1", 0, 0, None),
        ]);
        assert_eq!(zero_dims.unwrap_err().failure_kind(), FailureKind::Probe);
    }

    #[test]
    fn width_that_cannot_double_is_a_probe_error() {
        let wide = u32::MAX / 2 + 1;
        let err = locate_streams(vec![
            video(0, "30/1", wide, 480, None),
            video(1, "30/1", wide, 480, None),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::Probe(ref m) if m.contains("too large")));

        let widest = u32::MAX / 2;
        let asset = locate_streams(vec![
            video(0, "30/1", widest, 1, None),
            video(1, "30/1", widest, 1, None),
        ])
        .unwrap();
        assert_eq!(asset.sbs_dimensions().width, u32::MAX - 1);
    }

    #[test]
    fn probe_failure_is_tagged_as_probe_error() {
        let toolkit = ProbeOnly(Err(CoreError::OperationFailed("unreadable".into())));
        let err = locate(&toolkit, Path::new("broken.avi")).unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Probe);
        assert!(err.to_string().contains("unreadable"));
    }
}
