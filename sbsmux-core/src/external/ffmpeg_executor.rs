// ============================================================================
// sbsmux-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: Raw Frame Decoders and the SBS Encoder
//
// Implements the MediaToolkit capability on top of ffmpeg-sidecar:
// - one ffmpeg child per eye stream, writing packed rgb24 frames to stdout
// - one ffmpeg child for the output, reading composited rgb24 frames from
//   stdin and muxing them with the source audio
//
// Each child's stderr is drained on a background thread so ffmpeg never
// blocks on a full pipe; the last lines are kept for error messages.

use crate::config::AudioMode;
use crate::error::{CoreError, CoreResult, command_start_error, command_wait_error};
use crate::external::{
    ContainerProbe, EncodeRequest, EyeDecoder, MediaToolkit, SbsEncoder, check_dependency,
    ffprobe_executor,
};
use crate::processing::frame::{Dimensions, RAW_PIXEL_FORMAT, SbsFrame, VideoFrame};

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{ChildStderr, ChildStdin, ChildStdout};
use std::thread::JoinHandle;

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

// ============================================================================
// TOOLKIT
// ============================================================================

/// `MediaToolkit` backed by the ffmpeg and ffprobe executables.
#[derive(Debug, Clone, Default)]
pub struct FfmpegToolkit;

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self
    }

    /// Verifies that ffmpeg and ffprobe are available before building the toolkit.
    pub fn detect() -> CoreResult<Self> {
        check_dependency("ffmpeg")?;
        check_dependency("ffprobe")?;
        Ok(Self)
    }
}

impl MediaToolkit for FfmpegToolkit {
    type Decoder = SidecarDecoder;
    type Encoder = SidecarEncoder;

    fn probe(&self, path: &Path) -> CoreResult<ContainerProbe> {
        ffprobe_executor::probe_container(path)
    }

    fn open_decoder(
        &self,
        path: &Path,
        stream_index: usize,
        dimensions: Dimensions,
    ) -> CoreResult<SidecarDecoder> {
        let label = format!("ffmpeg (decode stream {stream_index})");
        let mut cmd = build_decode_command(path, stream_index);
        log::debug!("Running decode command: ffmpeg {}", command_line(&cmd));

        let mut child = cmd.spawn().map_err(|e| command_start_error(&label, e))?;
        let stdout = child.take_stdout().ok_or_else(|| {
            CoreError::Decode(format!("{label}: stdout pipe unavailable"))
        })?;
        let stderr = StderrTail::spawn(label.clone(), child.take_stderr());

        Ok(SidecarDecoder {
            stdout: BufReader::with_capacity(dimensions.frame_len().max(8 * 1024), stdout),
            child,
            stderr: Some(stderr),
            dimensions,
            label,
            finished: false,
        })
    }

    fn open_encoder(&self, request: &EncodeRequest) -> CoreResult<SidecarEncoder> {
        let label = "ffmpeg (encode)".to_string();
        let mut cmd = build_encode_command(request);
        log::debug!("Running encode command: ffmpeg {}", command_line(&cmd));

        let mut child = cmd.spawn().map_err(|e| command_start_error(&label, e))?;
        let stdin = child.take_stdin().ok_or_else(|| {
            CoreError::Encode(format!("{label}: stdin pipe unavailable"))
        })?;
        let stderr = StderrTail::spawn(label.clone(), child.take_stderr());

        Ok(SidecarEncoder {
            stdin: Some(BufWriter::with_capacity(
                request.dimensions.frame_len().max(8 * 1024),
                stdin,
            )),
            child,
            stderr: Some(stderr),
            dimensions: request.dimensions,
            label,
            completed: false,
        })
    }
}

// ============================================================================
// COMMAND BUILDERS
// ============================================================================

/// Space-joined arguments of `cmd`, for debug logging.
fn command_line(cmd: &FfmpegCommand) -> String {
    cmd.get_args()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the command decoding one stream to packed rgb24 frames on stdout.
///
/// `-fps_mode passthrough` keeps ffmpeg from duplicating or dropping frames,
/// so frame *n* on stdout is decode index *n* of the stream. `-xerror` makes a
/// corrupt packet end the process with a failure instead of being skipped,
/// which would shift every later frame by one index.
pub fn build_decode_command(input_path: &Path, stream_index: usize) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.args(["-nostdin", "-v", "error", "-xerror"]);
    cmd.input(input_path);
    cmd.args(["-map", &format!("0:{stream_index}")]);
    cmd.args(["-fps_mode", "passthrough", "-an", "-sn", "-dn"]);
    cmd.args(["-f", "rawvideo", "-pix_fmt", RAW_PIXEL_FORMAT]);
    cmd.output("pipe:1");
    cmd
}

/// Builds the command encoding rgb24 frames from stdin into the output container.
///
/// Input 0 is the raw SBS stream at the source frame rate; input 1 (only when
/// audio is requested) is the original file, from which just the selected
/// audio stream is mapped.
pub fn build_encode_command(request: &EncodeRequest) -> FfmpegCommand {
    let settings = &request.settings;
    let mut cmd = FfmpegCommand::new();
    cmd.hide_banner();
    cmd.args(["-v", "error", "-nostats"]);

    // Raw composited frames on stdin
    cmd.args(["-f", "rawvideo", "-pix_fmt", RAW_PIXEL_FORMAT]);
    cmd.args(["-s", &request.dimensions.to_string()]);
    cmd.args(["-framerate", &request.frame_rate.to_string()]);
    cmd.input("pipe:0");

    if let Some(audio) = &request.audio {
        cmd.input(&audio.path);
    }

    cmd.args(["-map", "0:v:0"]);
    if let Some(audio) = &request.audio {
        cmd.args(["-map", &format!("1:{}", audio.stream_index)]);
    }

    cmd.args(["-c:v", &settings.video_codec]);
    cmd.args(["-preset", &settings.preset]);
    cmd.args(["-crf", &settings.crf.to_string()]);
    cmd.args(["-pix_fmt", &settings.pixel_format]);

    if request.audio.is_some() {
        match settings.audio_mode {
            AudioMode::Copy => {
                cmd.args(["-c:a", "copy"]);
            }
            AudioMode::Aac { bitrate_kbps } => {
                cmd.args(["-c:a", "aac", "-b:a", &format!("{bitrate_kbps}k")]);
                cmd.args(["-flags:a", "+bitexact"]);
            }
        }
    }

    // Deterministic container: no inherited metadata, no encoder version strings
    cmd.args(["-map_metadata", "-1"]);
    cmd.args(["-fflags", "+bitexact", "-flags:v", "+bitexact"]);
    cmd.args(["-f", "mp4"]);
    cmd.overwrite();
    cmd.output(&request.output_path);
    cmd
}

// ============================================================================
// DECODER
// ============================================================================

/// Outcome of reading one fixed-size frame from a raw stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RawRead {
    Frame(Vec<u8>),
    /// Clean end of stream on a frame boundary
    End,
    /// Stream ended part-way through a frame; holds the bytes received
    Truncated(usize),
}

pub(crate) fn read_raw_frame<R: Read>(reader: &mut R, frame_len: usize) -> io::Result<RawRead> {
    let mut buf = vec![0u8; frame_len];
    let mut filled = 0;
    while filled < frame_len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(match filled {
        0 => RawRead::End,
        n if n == frame_len => RawRead::Frame(buf),
        n => RawRead::Truncated(n),
    })
}

/// Decoder for one eye stream, reading raw frames from an ffmpeg child.
///
/// Dropping an unfinished decoder kills its child; this is how the surplus
/// frames of the longer eye stream are discarded.
pub struct SidecarDecoder {
    child: FfmpegChild,
    stdout: BufReader<ChildStdout>,
    stderr: Option<StderrTail>,
    dimensions: Dimensions,
    label: String,
    finished: bool,
}

impl SidecarDecoder {
    fn wait_for_exit(&mut self) -> CoreResult<()> {
        let status = self
            .child
            .wait()
            .map_err(|e| command_wait_error(&self.label, e))?;
        let stderr = self.stderr.take().map(StderrTail::collect).unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(CoreError::Decode(format!(
                "{} exited with {}: {}",
                self.label, status, stderr
            )))
        }
    }
}

impl EyeDecoder for SidecarDecoder {
    fn decode_frame(&mut self) -> CoreResult<Option<VideoFrame>> {
        if self.finished {
            return Ok(None);
        }

        let read = read_raw_frame(&mut self.stdout, self.dimensions.frame_len());
        match read {
            Ok(RawRead::Frame(data)) => VideoFrame::from_raw(self.dimensions, data).map(Some),
            Ok(RawRead::End) => {
                self.finished = true;
                self.wait_for_exit()?;
                Ok(None)
            }
            Ok(RawRead::Truncated(received)) => {
                self.finished = true;
                let exit = self.wait_for_exit().err();
                Err(CoreError::Decode(format!(
                    "{}: stream ended inside a frame ({} of {} bytes){}",
                    self.label,
                    received,
                    self.dimensions.frame_len(),
                    exit.map(|e| format!("; {e}")).unwrap_or_default()
                )))
            }
            Err(e) => {
                self.finished = true;
                let _ = self.child.kill();
                let _ = self.child.wait();
                Err(CoreError::Decode(format!("{}: read failed: {}", self.label, e)))
            }
        }
    }
}

impl Drop for SidecarDecoder {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("{}: stopping before end of stream", self.label);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

// ============================================================================
// ENCODER
// ============================================================================

/// Encoder writing composited frames into an ffmpeg child's stdin.
pub struct SidecarEncoder {
    child: FfmpegChild,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr: Option<StderrTail>,
    dimensions: Dimensions,
    label: String,
    completed: bool,
}

impl SidecarEncoder {
    /// Closes stdin and waits for ffmpeg, returning its stderr tail on failure.
    fn close_and_wait(&mut self) -> CoreResult<()> {
        let flushed = match self.stdin.take() {
            Some(mut stdin) => stdin.flush(),
            None => Ok(()),
        };
        self.completed = true;
        let status = self
            .child
            .wait()
            .map_err(|e| command_wait_error(&self.label, e))?;
        let stderr = self.stderr.take().map(StderrTail::collect).unwrap_or_default();

        if !status.success() {
            return Err(CoreError::Encode(format!(
                "{} exited with {}: {}",
                self.label, status, stderr
            )));
        }
        flushed.map_err(|e| CoreError::Encode(format!("{}: flushing frames failed: {}", self.label, e)))
    }
}

impl SbsEncoder for SidecarEncoder {
    fn write_frame(&mut self, frame: &SbsFrame) -> CoreResult<()> {
        if frame.frame.dimensions() != self.dimensions {
            return Err(CoreError::Encode(format!(
                "frame {} is {}, encoder expects {}",
                frame.index,
                frame.frame.dimensions(),
                self.dimensions
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CoreError::Encode(format!("{}: input already closed", self.label)))?;

        if let Err(write_err) = stdin.write_all(frame.frame.data()) {
            // ffmpeg usually stops reading because it failed; its stderr says why.
            let detail = match self.close_and_wait() {
                Err(exit_err) => exit_err.to_string(),
                Ok(()) => write_err.to_string(),
            };
            return Err(CoreError::Encode(format!(
                "{} stopped accepting frames at frame {}: {}",
                self.label, frame.index, detail
            )));
        }
        Ok(())
    }

    fn finish(mut self) -> CoreResult<()> {
        self.close_and_wait()
    }

    fn abort(mut self) {
        self.stdin.take();
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.completed = true;
    }
}

impl Drop for SidecarEncoder {
    fn drop(&mut self) {
        if !self.completed {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

// ============================================================================
// STDERR DRAIN
// ============================================================================

/// Background reader keeping the last lines of a child's stderr.
struct StderrTail {
    handle: Option<JoinHandle<Vec<String>>>,
}

impl StderrTail {
    fn spawn(label: String, stderr: Option<ChildStderr>) -> Self {
        let handle = stderr.map(|stderr| {
            std::thread::spawn(move || {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    log::debug!("{label}: {line}");
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail.into_iter().collect()
            })
        });
        Self { handle }
    }

    fn collect(mut self) -> String {
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .map(|lines| lines.join("\n"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::external::{AudioSource, EncoderSettings};
    use crate::processing::frame::FrameRate;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn args_of(cmd: &FfmpegCommand) -> Vec<String> {
        cmd.get_args()
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    fn request(audio: Option<AudioSource>, mode: AudioMode) -> EncodeRequest {
        let mut config = CoreConfig::default();
        config.audio = mode;
        EncodeRequest {
            output_path: PathBuf::from("/out/.clip_SBS.tmp.mp4"),
            dimensions: Dimensions::new(1280, 480),
            frame_rate: FrameRate::new(30000, 1001).unwrap(),
            audio,
            settings: EncoderSettings::from(&config),
        }
    }

    fn contains_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn decode_command_maps_single_stream_to_raw_rgb() {
        let args = args_of(&build_decode_command(Path::new("/in/clip.avi"), 2));
        assert!(contains_pair(&args, "-i", "/in/clip.avi"));
        assert!(contains_pair(&args, "-map", "0:2"));
        assert!(contains_pair(&args, "-fps_mode", "passthrough"));
        assert!(args.iter().any(|a| a == "-xerror"), "a corrupt frame must stop the decoder");
        assert!(contains_pair(&args, "-f", "rawvideo"));
        assert!(contains_pair(&args, "-pix_fmt", "rgb24"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn encode_command_copies_audio_at_exact_rate() {
        let audio = AudioSource {
            path: PathBuf::from("/in/clip.avi"),
            stream_index: 1,
        };
        let args = args_of(&build_encode_command(&request(Some(audio), AudioMode::Copy)));
        assert!(contains_pair(&args, "-s", "1280x480"));
        assert!(contains_pair(&args, "-framerate", "30000/1001"));
        assert!(contains_pair(&args, "-i", "pipe:0"));
        assert!(contains_pair(&args, "-i", "/in/clip.avi"));
        assert!(contains_pair(&args, "-map", "1:1"));
        assert!(contains_pair(&args, "-c:a", "copy"));
        assert!(contains_pair(&args, "-c:v", "libx264"));
        assert!(contains_pair(&args, "-crf", "18"));
        assert!(!args.iter().any(|a| a == "-shortest"));
        assert_eq!(args.last().map(String::as_str), Some("/out/.clip_SBS.tmp.mp4"));
    }

    #[test]
    fn encode_command_without_audio_has_single_input() {
        let args = args_of(&build_encode_command(&request(None, AudioMode::Copy)));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert!(contains_pair(&args, "-map", "0:v:0"));
    }

    #[test]
    fn encode_command_aac_mode_sets_bitrate() {
        let audio = AudioSource {
            path: PathBuf::from("/in/clip.avi"),
            stream_index: 1,
        };
        let args = args_of(&build_encode_command(&request(
            Some(audio),
            AudioMode::Aac { bitrate_kbps: 192 },
        )));
        assert!(contains_pair(&args, "-c:a", "aac"));
        assert!(contains_pair(&args, "-b:a", "192k"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_reach_ffmpeg_unchanged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let input = Path::new(OsStr::from_bytes(b"/in/DSCF\xff0001.avi"));
        let decode = build_decode_command(input, 0);
        assert!(decode.get_args().any(|a| a == input.as_os_str()));

        let mut req = request(
            Some(AudioSource {
                path: input.to_path_buf(),
                stream_index: 1,
            }),
            AudioMode::Copy,
        );
        req.output_path = PathBuf::from(OsStr::from_bytes(b"/out/.DSCF\xff0001_SBS.mp4"));
        let encode = build_encode_command(&req);
        assert!(encode.get_args().any(|a| a == input.as_os_str()));
        assert_eq!(encode.get_args().last(), Some(req.output_path.as_os_str()));
    }

    #[test]
    fn raw_reader_splits_frames_and_detects_truncation() {
        let mut reader = Cursor::new(vec![1u8; 10]);
        assert_eq!(read_raw_frame(&mut reader, 4).unwrap(), RawRead::Frame(vec![1; 4]));
        assert_eq!(read_raw_frame(&mut reader, 4).unwrap(), RawRead::Frame(vec![1; 4]));
        assert_eq!(read_raw_frame(&mut reader, 4).unwrap(), RawRead::Truncated(2));

        let mut empty = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_raw_frame(&mut empty, 4).unwrap(), RawRead::End);
    }
}
