// ============================================================================
// sbsmux-core/src/processing/sink.rs
// ============================================================================
//
// ENCODE & MUX SINK: Composited Frames In, One Finished File Out
//
// The sink drains the frame-pair sequence, composites every pair and feeds
// the result to the toolkit's encoder together with the source audio stream.
// The encoder writes to a staging file; only after it finishes successfully
// is the staging file renamed to the final output name. Any failure aborts
// the encoder and drops the staging file.
//
// Pair indexes must arrive strictly increasing. A gap or repeat means the
// decoder and the encoder disagree on the timeline and fails the job.

use crate::error::{CoreError, CoreResult, FailureKind};
use crate::external::{AudioSource, EncodeRequest, EncoderSettings, MediaToolkit, SbsEncoder};
use crate::processing::compositor::compose;
use crate::processing::frame::FramePair;
use crate::processing::locator::SourceAsset;
use crate::reporting::{JobProgress, Reporter};
use crate::temp_files::{create_staging_path, persist_staging};

use std::path::Path;

/// Number of pairs between progress reports.
const PROGRESS_INTERVAL: u64 = 25;

/// What the sink wrote for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSummary {
    pub frame_pairs: u64,
    pub has_audio: bool,
}

/// Encodes every pair from `pairs` into `output_path`.
///
/// # Errors
///
/// * `CoreError::Decode` - a pair failed to decode; passed through unchanged
/// * `CoreError::Decode` - the sequence was empty, so there is nothing to encode
/// * `CoreError::Encode` - the encoder failed, or pairs arrived out of order
pub fn encode_and_mux<T, I>(
    toolkit: &T,
    asset: &SourceAsset,
    pairs: I,
    settings: &EncoderSettings,
    output_path: &Path,
    reporter: &dyn Reporter,
) -> CoreResult<SinkSummary>
where
    T: MediaToolkit + ?Sized,
    I: IntoIterator<Item = CoreResult<FramePair>>,
{
    let output_dir = output_path.parent().unwrap_or_else(|| Path::new("."));
    let final_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CoreError::PathError(format!("Output path has no file name: {}", output_path.display()))
        })?;
    let staging = create_staging_path(output_dir, &final_name)?;

    let request = EncodeRequest {
        output_path: staging.to_path_buf(),
        dimensions: asset.sbs_dimensions(),
        frame_rate: asset.frame_rate,
        audio: asset.audio_stream.map(|stream_index| AudioSource {
            path: asset.path.clone(),
            stream_index,
        }),
        settings: settings.clone(),
    };
    log::debug!(
        "Opening encoder for {} ({} @ {} fps)",
        output_path.display(),
        request.dimensions,
        request.frame_rate
    );
    let mut encoder = toolkit
        .open_encoder(&request)
        .map_err(|e| e.in_stage(FailureKind::Encode))?;

    let frame_pairs = match feed_encoder(&mut encoder, asset, pairs, output_path, reporter) {
        Ok(count) => count,
        Err(e) => {
            encoder.abort();
            // `staging` is dropped here, removing the partial file
            return Err(e);
        }
    };

    encoder
        .finish()
        .map_err(|e| e.in_stage(FailureKind::Encode))?;
    persist_staging(staging, output_path).map_err(|e| e.in_stage(FailureKind::Encode))?;

    Ok(SinkSummary {
        frame_pairs,
        has_audio: request.audio.is_some(),
    })
}

fn feed_encoder<E, I>(
    encoder: &mut E,
    asset: &SourceAsset,
    pairs: I,
    output_path: &Path,
    reporter: &dyn Reporter,
) -> CoreResult<u64>
where
    E: SbsEncoder,
    I: IntoIterator<Item = CoreResult<FramePair>>,
{
    let mut expected_index = 0u64;
    for pair in pairs {
        let pair = pair.map_err(|e| e.in_stage(FailureKind::Decode))?;
        if pair.index != expected_index {
            return Err(CoreError::Encode(format!(
                "frame pair {} arrived where {} was expected",
                pair.index, expected_index
            )));
        }

        let sbs = compose(&pair);
        encoder
            .write_frame(&sbs)
            .map_err(|e| e.in_stage(FailureKind::Encode))?;
        expected_index += 1;

        if expected_index % PROGRESS_INTERVAL == 0 {
            reporter.job_progress(&JobProgress {
                input: asset.path.clone(),
                output: output_path.to_path_buf(),
                frames_done: expected_index,
                frames_total: asset.frame_count,
            });
        }
    }

    if expected_index == 0 {
        return Err(CoreError::Decode(format!(
            "{} produced no frame pairs",
            asset.path.display()
        )));
    }
    Ok(expected_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::external::{ContainerProbe, EyeDecoder};
    use crate::processing::frame::{Dimensions, FrameRate, SbsFrame, VideoFrame};
    use crate::reporting::NullReporter;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorded {
        frames: Vec<u64>,
        finished: bool,
        aborted: bool,
    }

    struct RecordingEncoder {
        path: std::path::PathBuf,
        log: Arc<Mutex<Recorded>>,
    }

    impl SbsEncoder for RecordingEncoder {
        fn write_frame(&mut self, frame: &SbsFrame) -> CoreResult<()> {
            self.log.lock().unwrap().frames.push(frame.index);
            Ok(())
        }
        fn finish(self) -> CoreResult<()> {
            std::fs::write(&self.path, b"encoded")?;
            self.log.lock().unwrap().finished = true;
            Ok(())
        }
        fn abort(self) {
            std::fs::write(&self.path, b"partial").unwrap();
            self.log.lock().unwrap().aborted = true;
        }
    }

    struct NoDecoder;
    impl EyeDecoder for NoDecoder {
        fn decode_frame(&mut self) -> CoreResult<Option<VideoFrame>> {
            Ok(None)
        }
    }

    struct Toolkit(Arc<Mutex<Recorded>>);

    impl MediaToolkit for Toolkit {
        type Decoder = NoDecoder;
        type Encoder = RecordingEncoder;

        fn probe(&self, _: &Path) -> CoreResult<ContainerProbe> {
            Ok(ContainerProbe::default())
        }
        fn open_decoder(&self, _: &Path, _: usize, _: Dimensions) -> CoreResult<NoDecoder> {
            Ok(NoDecoder)
        }
        fn open_encoder(&self, request: &EncodeRequest) -> CoreResult<RecordingEncoder> {
            Ok(RecordingEncoder {
                path: request.output_path.clone(),
                log: Arc::clone(&self.0),
            })
        }
    }

    fn asset() -> SourceAsset {
        SourceAsset {
            path: "in/clip.avi".into(),
            left_stream: 0,
            right_stream: 1,
            audio_stream: None,
            frame_rate: FrameRate::new(30, 1).unwrap(),
            eye_dimensions: Dimensions::new(1, 1),
            frame_count: None,
            left_frame_count: None,
            right_frame_count: None,
        }
    }

    fn pair(index: u64) -> CoreResult<FramePair> {
        let frame = VideoFrame::from_raw(Dimensions::new(1, 1), vec![0; 3])?;
        Ok(FramePair {
            index,
            left: frame.clone(),
            right: frame,
        })
    }

    fn run(pairs: Vec<CoreResult<FramePair>>) -> (CoreResult<SinkSummary>, Arc<Mutex<Recorded>>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(Mutex::new(Recorded::default()));
        let settings = EncoderSettings::from(&CoreConfig::default());
        let result = encode_and_mux(
            &Toolkit(Arc::clone(&log)),
            &asset(),
            pairs,
            &settings,
            &dir.path().join("clip_SBS.mp4"),
            &NullReporter,
        );
        (result, log, dir)
    }

    fn dir_entries(dir: &tempfile::TempDir) -> Vec<String> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn finished_output_appears_under_final_name() {
        let (result, log, dir) = run(vec![pair(0), pair(1), pair(2)]);
        let summary = result.unwrap();
        assert_eq!(summary.frame_pairs, 3);
        assert!(!summary.has_audio);
        assert_eq!(log.lock().unwrap().frames, vec![0, 1, 2]);
        assert!(log.lock().unwrap().finished);
        assert_eq!(dir_entries(&dir), vec!["clip_SBS.mp4".to_string()]);
    }

    #[test]
    fn out_of_order_pair_fails_without_output() {
        let (result, log, dir) = run(vec![pair(0), pair(2)]);
        let err = result.unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Encode);
        assert!(log.lock().unwrap().aborted);
        assert!(dir_entries(&dir).is_empty());
    }

    #[test]
    fn decode_error_mid_stream_leaves_nothing_behind() {
        let (result, _log, dir) = run(vec![
            pair(0),
            Err(CoreError::Decode("bad frame".into())),
        ]);
        assert_eq!(result.unwrap_err().failure_kind(), FailureKind::Decode);
        assert!(dir_entries(&dir).is_empty());
    }

    #[test]
    fn empty_sequence_is_a_decode_error() {
        let (result, _log, dir) = run(Vec::new());
        assert_eq!(result.unwrap_err().failure_kind(), FailureKind::Decode);
        assert!(dir_entries(&dir).is_empty());
    }
}
