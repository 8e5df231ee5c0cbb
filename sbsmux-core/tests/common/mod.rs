// sbsmux-core/tests/common/mod.rs
//
// In-memory MediaToolkit used by the integration tests. Sources are
// registered per input path; the encoder writes a small self-describing file
// so tests can check every frame and the audio payload that reached it.

#![allow(dead_code)]

use sbsmux_core::error::{CoreError, CoreResult};
use sbsmux_core::external::{
    ContainerProbe, EncodeRequest, EyeDecoder, MediaToolkit, SbsEncoder, StreamInfo, StreamKind,
};
use sbsmux_core::processing::frame::{Dimensions, FrameRate, SbsFrame, VideoFrame};

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const EYE_DIMS: Dimensions = Dimensions {
    width: 4,
    height: 2,
};

/// Stream indexes used by the mock container layout.
pub const LEFT_STREAM: usize = 0;
pub const AUDIO_STREAM: usize = 1;
pub const RIGHT_STREAM: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// Pixel value of `eye` frame `index` at byte `offset`; unique per eye and frame.
pub fn pixel_byte(eye: Eye, index: usize, offset: usize) -> u8 {
    let base = match eye {
        Eye::Left => 0u8,
        Eye::Right => 128u8,
    };
    base.wrapping_add((index as u8).wrapping_mul(7))
        .wrapping_add(offset as u8)
}

pub fn eye_frame(eye: Eye, index: usize, dims: Dimensions) -> VideoFrame {
    let data = (0..dims.frame_len())
        .map(|offset| pixel_byte(eye, index, offset))
        .collect();
    VideoFrame::from_raw(dims, data).unwrap()
}

#[derive(Clone, Debug)]
pub struct MockSource {
    pub frame_rate: FrameRate,
    pub dims: Dimensions,
    pub left_frames: usize,
    pub right_frames: usize,
    pub audio: Option<Vec<u8>>,
    pub video_streams: usize,
    pub fail_decode: Option<(Eye, usize)>,
    pub fail_encode_at: Option<u64>,
}

impl MockSource {
    pub fn new(left_frames: usize, right_frames: usize) -> Self {
        Self {
            frame_rate: FrameRate::new(30, 1).unwrap(),
            dims: EYE_DIMS,
            left_frames,
            right_frames,
            audio: Some(b"PCM-AUDIO-PAYLOAD".to_vec()),
            video_streams: 2,
            fail_decode: None,
            fail_encode_at: None,
        }
    }

    pub fn without_audio(mut self) -> Self {
        self.audio = None;
        self
    }

    pub fn with_audio(mut self, payload: &[u8]) -> Self {
        self.audio = Some(payload.to_vec());
        self
    }

    pub fn with_rate(mut self, num: u32, den: u32) -> Self {
        self.frame_rate = FrameRate::new(num, den).unwrap();
        self
    }

    pub fn single_video_stream(mut self) -> Self {
        self.video_streams = 1;
        self
    }

    pub fn failing_decode(mut self, eye: Eye, at: usize) -> Self {
        self.fail_decode = Some((eye, at));
        self
    }

    pub fn failing_encode(mut self, at: u64) -> Self {
        self.fail_encode_at = Some(at);
        self
    }

    fn probe(&self) -> ContainerProbe {
        let video = |index, frames: usize| StreamInfo {
            index,
            kind: StreamKind::Video,
            codec_name: Some("mjpeg".to_string()),
            dimensions: Some(self.dims),
            frame_rate: Some(self.frame_rate),
            frame_count: Some(frames as u64),
        };
        let mut streams = vec![video(LEFT_STREAM, self.left_frames)];
        if self.audio.is_some() {
            streams.push(StreamInfo {
                index: AUDIO_STREAM,
                kind: StreamKind::Audio,
                codec_name: Some("pcm_s16le".to_string()),
                dimensions: None,
                frame_rate: None,
                frame_count: None,
            });
        }
        if self.video_streams > 1 {
            streams.push(video(RIGHT_STREAM, self.right_frames));
        }
        ContainerProbe { streams }
    }
}

#[derive(Default)]
pub struct MockToolkit {
    sources: HashMap<PathBuf, MockSource>,
    pub encode_requests: Mutex<Vec<EncodeRequest>>,
}

impl MockToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under `path` and creates the (empty) input file.
    pub fn add_source(&mut self, path: &Path, source: MockSource) {
        File::create(path).unwrap();
        self.sources.insert(path.to_path_buf(), source);
    }

    pub fn encode_count(&self) -> usize {
        self.encode_requests.lock().unwrap().len()
    }

    fn source(&self, path: &Path) -> CoreResult<&MockSource> {
        self.sources
            .get(path)
            .ok_or_else(|| CoreError::OperationFailed(format!("invalid data found when processing {}", path.display())))
    }
}

pub struct MockDecoder {
    frames: VecDeque<VideoFrame>,
    fail_at: Option<usize>,
    served: usize,
}

impl EyeDecoder for MockDecoder {
    fn decode_frame(&mut self) -> CoreResult<Option<VideoFrame>> {
        if self.fail_at == Some(self.served) {
            self.fail_at = None;
            self.frames.clear();
            return Err(CoreError::Decode("corrupt video chunk".to_string()));
        }
        self.served += 1;
        Ok(self.frames.pop_front())
    }
}

pub struct MockEncoder {
    writer: BufWriter<File>,
    audio: Option<Vec<u8>>,
    fail_at: Option<u64>,
    frame_len: usize,
}

impl SbsEncoder for MockEncoder {
    fn write_frame(&mut self, frame: &SbsFrame) -> CoreResult<()> {
        if self.fail_at == Some(frame.index) {
            return Err(CoreError::Encode("encoder rejected frame".to_string()));
        }
        assert_eq!(frame.frame.data().len(), self.frame_len);
        self.writer.write_all(b"F")?;
        self.writer.write_all(&frame.index.to_le_bytes())?;
        self.writer.write_all(frame.frame.data())?;
        Ok(())
    }

    fn finish(mut self) -> CoreResult<()> {
        if let Some(audio) = &self.audio {
            self.writer.write_all(b"A")?;
            self.writer.write_all(&(audio.len() as u64).to_le_bytes())?;
            self.writer.write_all(audio)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn abort(mut self) {
        let _ = self.writer.flush();
    }
}

impl MediaToolkit for MockToolkit {
    type Decoder = MockDecoder;
    type Encoder = MockEncoder;

    fn probe(&self, path: &Path) -> CoreResult<ContainerProbe> {
        Ok(self.source(path)?.probe())
    }

    fn open_decoder(
        &self,
        path: &Path,
        stream_index: usize,
        dimensions: Dimensions,
    ) -> CoreResult<MockDecoder> {
        let source = self.source(path)?;
        let (eye, count) = match stream_index {
            LEFT_STREAM => (Eye::Left, source.left_frames),
            RIGHT_STREAM => (Eye::Right, source.right_frames),
            other => return Err(CoreError::Decode(format!("stream {other} is not video"))),
        };
        let fail_at = source
            .fail_decode
            .filter(|(failing, _)| *failing == eye)
            .map(|(_, at)| at);
        Ok(MockDecoder {
            frames: (0..count).map(|i| eye_frame(eye, i, dimensions)).collect(),
            fail_at,
            served: 0,
        })
    }

    fn open_encoder(&self, request: &EncodeRequest) -> CoreResult<MockEncoder> {
        self.encode_requests.lock().unwrap().push(request.clone());

        // The audio input is the only link back to the source, so encode
        // failures can only be scripted for sources that carry audio.
        let (audio, fail_at) = match &request.audio {
            Some(audio) => {
                let source = self.source(&audio.path)?;
                assert_eq!(audio.stream_index, AUDIO_STREAM);
                (source.audio.clone(), source.fail_encode_at)
            }
            None => (None, None),
        };

        let mut writer = BufWriter::new(File::create(&request.output_path)?);
        writer.write_all(b"SBS1")?;
        writer.write_all(&request.dimensions.width.to_le_bytes())?;
        writer.write_all(&request.dimensions.height.to_le_bytes())?;
        writer.write_all(&request.frame_rate.num.to_le_bytes())?;
        writer.write_all(&request.frame_rate.den.to_le_bytes())?;

        Ok(MockEncoder {
            writer,
            audio,
            fail_at,
            frame_len: request.dimensions.frame_len(),
        })
    }
}

/// Parsed contents of a file written by `MockEncoder`.
#[derive(Debug)]
pub struct MockOutput {
    pub dimensions: Dimensions,
    pub frame_rate: FrameRate,
    pub frames: Vec<(u64, Vec<u8>)>,
    pub audio: Option<Vec<u8>>,
}

pub fn read_output(path: &Path) -> MockOutput {
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..4], b"SBS1");
    let u32_at = |at: usize| u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
    let u64_at = |at: usize| u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap());

    let dimensions = Dimensions::new(u32_at(4), u32_at(8));
    let frame_rate = FrameRate::new(u32_at(12), u32_at(16)).unwrap();
    let frame_len = dimensions.frame_len();

    let mut pos = 20;
    let mut frames = Vec::new();
    let mut audio = None;
    while pos < bytes.len() {
        match bytes[pos] {
            b'F' => {
                let index = u64_at(pos + 1);
                let start = pos + 9;
                frames.push((index, bytes[start..start + frame_len].to_vec()));
                pos = start + frame_len;
            }
            b'A' => {
                let len = u64_at(pos + 1) as usize;
                let start = pos + 9;
                audio = Some(bytes[start..start + len].to_vec());
                pos = start + len;
            }
            other => panic!("unexpected tag {other} at {pos}"),
        }
    }

    MockOutput {
        dimensions,
        frame_rate,
        frames,
        audio,
    }
}

/// Names of all entries in `dir`, sorted.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
