//! Outcome reporting for batch runs.
//!
//! The batch orchestrator announces what it is doing through the `Reporter`
//! trait. Implementations decide how (or whether) to show it: `NullReporter`
//! discards everything, `TerminalReporter` prints styled sections with a
//! progress bar per running job, and `JsonReporter` writes one JSON object per
//! line for a front end to consume. `LogReporter` lives in `file_logging`.

use crate::processing::batch::{BatchResult, ConversionJob, JobStatus, OutputDetail};
use crate::processing::locator::SourceAsset;
use crate::utils::{format_bytes, format_duration, get_filename_safe};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde_json::json;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Batch start metadata.
#[derive(Clone, Debug)]
pub struct BatchStartInfo {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Configured parallel job count
    pub jobs: usize,
}

/// A job moving from Pending to Running.
#[derive(Clone, Debug)]
pub struct JobStartInfo {
    /// 1-based position in the batch
    pub position: usize,
    pub total: usize,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Frames written so far for one running job.
#[derive(Clone, Debug)]
pub struct JobProgress {
    pub input: PathBuf,
    pub output: PathBuf,
    pub frames_done: u64,
    /// Expected pair count, when the container reports frame counts
    pub frames_total: Option<u64>,
}

impl JobProgress {
    pub fn percent(&self) -> Option<f64> {
        self.frames_total
            .filter(|total| *total > 0)
            .map(|total| (self.frames_done as f64 / total as f64 * 100.0).min(100.0))
    }
}

/// High-level error message for failures outside any single job.
#[derive(Clone, Debug)]
pub struct ReporterError {
    pub title: String,
    pub message: String,
    pub context: Option<String>,
    pub suggestion: Option<String>,
}

/// Reporter interface implemented by both human-readable and JSON reporters.
pub trait Reporter: Send + Sync {
    fn batch_started(&self, _info: &BatchStartInfo) {}
    fn job_started(&self, _info: &JobStartInfo) {}
    fn source_located(&self, _asset: &SourceAsset) {}
    fn job_progress(&self, _progress: &JobProgress) {}
    /// Called once per job, when it reaches Succeeded or Failed.
    fn job_complete(&self, _job: &ConversionJob) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _error: &ReporterError) {}
    fn batch_complete(&self, _result: &BatchResult) {}
}

/// No-op reporter that discards all updates.
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Forwards every event to each wrapped reporter in order.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

impl Reporter for MultiReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        self.reporters.iter().for_each(|r| r.batch_started(info));
    }
    fn job_started(&self, info: &JobStartInfo) {
        self.reporters.iter().for_each(|r| r.job_started(info));
    }
    fn source_located(&self, asset: &SourceAsset) {
        self.reporters.iter().for_each(|r| r.source_located(asset));
    }
    fn job_progress(&self, progress: &JobProgress) {
        self.reporters.iter().for_each(|r| r.job_progress(progress));
    }
    fn job_complete(&self, job: &ConversionJob) {
        self.reporters.iter().for_each(|r| r.job_complete(job));
    }
    fn warning(&self, message: &str) {
        self.reporters.iter().for_each(|r| r.warning(message));
    }
    fn error(&self, error: &ReporterError) {
        self.reporters.iter().for_each(|r| r.error(error));
    }
    fn batch_complete(&self, result: &BatchResult) {
        self.reporters.iter().for_each(|r| r.batch_complete(result));
    }
}

fn display_name(path: &Path) -> String {
    get_filename_safe(path).unwrap_or_else(|_| path.display().to_string())
}

/// Human-friendly reporter that prints concise text output.
pub struct TerminalReporter {
    bars: MultiProgress,
    progress: Mutex<HashMap<PathBuf, ProgressBar>>,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            bars: MultiProgress::new(),
            progress: Mutex::new(HashMap::new()),
        }
    }

    fn println(&self, line: String) {
        // Active bars are hidden while the line is printed, then redrawn.
        self.bars.suspend(|| println!("{line}"));
    }

    fn finish_progress(&self, input: &Path) {
        if let Ok(mut bars) = self.progress.lock() {
            if let Some(pb) = bars.remove(input) {
                pb.finish_and_clear();
            }
        }
    }

    fn start_progress(&self, input: &Path, total: Option<u64>) {
        let pb = match total {
            Some(total) => {
                let style = ProgressStyle::default_bar()
                    .template("{prefix:.bold} [{bar:40}] {pos}/{len} frames | {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> ");
                ProgressBar::new(total).with_style(style)
            }
            None => {
                let style = ProgressStyle::default_spinner()
                    .template("{prefix:.bold} {spinner} {pos} frames | {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                ProgressBar::new_spinner().with_style(style)
            }
        };
        let pb = self.bars.add(pb);
        pb.set_prefix(display_name(input));
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut bars) = self.progress.lock() {
            if let Some(old) = bars.insert(input.to_path_buf(), pb) {
                old.finish_and_clear();
            }
        }
    }
}

impl Reporter for TerminalReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        self.println(format!("\n{}", style("BATCH").bold().cyan()));
        self.println(format!(
            "  Processing {} file(s) -> {}",
            info.inputs.len(),
            style(info.output_dir.display()).bold()
        ));
        if info.jobs > 1 {
            self.println(format!("  Running up to {} jobs at once", info.jobs));
        }
        for (idx, input) in info.inputs.iter().enumerate() {
            self.println(format!("  {}. {}", idx + 1, display_name(input)));
        }
    }

    fn job_started(&self, info: &JobStartInfo) {
        self.println(format!(
            "\nFile {} of {}: {}",
            style(info.position.to_string()).bold(),
            info.total,
            style(display_name(&info.input)).bold()
        ));
    }

    fn source_located(&self, asset: &SourceAsset) {
        let audio = match asset.audio_stream {
            Some(index) => format!("stream {index}"),
            None => style("none").dim().to_string(),
        };
        self.println(format!(
            "  {:<8} left stream {}, right stream {}, audio {}",
            style("Streams:").bold(),
            asset.left_stream,
            asset.right_stream,
            audio
        ));
        self.println(format!(
            "  {:<8} {} per eye -> {} at {} fps",
            style("Video:").bold(),
            asset.eye_dimensions,
            asset.sbs_dimensions(),
            asset.frame_rate
        ));
        self.start_progress(&asset.path, asset.frame_count);
    }

    fn job_progress(&self, progress: &JobProgress) {
        if let Ok(bars) = self.progress.lock() {
            if let Some(pb) = bars.get(&progress.input) {
                pb.set_position(progress.frames_done);
                if let Some(percent) = progress.percent() {
                    pb.set_message(format!("{percent:.0}%"));
                }
            }
        }
    }

    fn job_complete(&self, job: &ConversionJob) {
        self.finish_progress(&job.input);
        match &job.status {
            JobStatus::Succeeded(success) => {
                let detail = match &success.detail {
                    OutputDetail::Video {
                        frame_pairs,
                        dimensions,
                        audio,
                        ..
                    } => format!(
                        "{} frames, {}, {}",
                        frame_pairs,
                        dimensions,
                        if *audio { "with audio" } else { "no audio" }
                    ),
                    OutputDetail::Still { dimensions } => dimensions.to_string(),
                };
                self.println(format!(
                    "  {} {} ({}, {}, {})",
                    style("✓").green().bold(),
                    style(display_name(&success.output_path)).green(),
                    detail,
                    format_bytes(success.output_size),
                    format_duration(success.elapsed_secs)
                ));
            }
            JobStatus::Failed(failure) => {
                self.println(format!(
                    "  {} {} {}: {}",
                    style("✗").red().bold(),
                    display_name(&job.input),
                    style(failure.kind).red().bold(),
                    failure.message
                ));
            }
            JobStatus::Pending | JobStatus::Running => {}
        }
    }

    fn warning(&self, message: &str) {
        self.println(format!("\n{}", style(format!("WARN: {message}")).yellow().bold()));
    }

    fn error(&self, error: &ReporterError) {
        eprintln!(
            "\n{} {}",
            style("ERROR").red().bold(),
            style(&error.title).red().bold()
        );
        eprintln!("  {}", error.message);
        if let Some(ctx) = &error.context {
            eprintln!("  Context: {ctx}");
        }
        if let Some(suggestion) = &error.suggestion {
            eprintln!("  Suggestion: {suggestion}");
        }
    }

    fn batch_complete(&self, result: &BatchResult) {
        self.println(format!("\n{}", style("BATCH SUMMARY").bold().cyan()));
        let headline = format!(
            "{} of {} succeeded",
            result.succeeded_count(),
            result.jobs.len()
        );
        if result.all_succeeded() {
            self.println(format!("  {}", style(headline).green().bold()));
        } else {
            self.println(format!("  {}", style(headline).yellow().bold()));
        }
        self.println(format!(
            "  Written: {} in {}",
            format_bytes(result.total_output_size()),
            format_duration(result.elapsed_secs)
        ));
        for job in &result.jobs {
            if let Some(failure) = job.failure() {
                self.println(format!(
                    "  - {} ({}): {}",
                    display_name(&job.input),
                    style(failure.kind).red(),
                    failure.message
                ));
            }
        }
    }
}

/// JSON-lines reporter for external front ends.
pub struct JsonReporter {
    writer: Mutex<Box<dyn Write + Send>>,
    last_progress_bucket: Mutex<HashMap<PathBuf, i64>>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            last_progress_bucket: Mutex::new(HashMap::new()),
        }
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn write_value(&self, value: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{value}");
            let _ = writer.flush();
        }
    }
}

impl Reporter for JsonReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        self.write_value(json!({
            "type": "batch_started",
            "inputs": info.inputs,
            "output_dir": info.output_dir,
            "jobs": info.jobs,
            "timestamp": Self::timestamp(),
        }));
    }

    fn job_started(&self, info: &JobStartInfo) {
        if let Ok(mut buckets) = self.last_progress_bucket.lock() {
            buckets.insert(info.input.clone(), -1);
        }
        self.write_value(json!({
            "type": "job_started",
            "position": info.position,
            "total": info.total,
            "input": info.input,
            "output": info.output,
            "timestamp": Self::timestamp(),
        }));
    }

    fn source_located(&self, asset: &SourceAsset) {
        self.write_value(json!({
            "type": "source_located",
            "source": asset,
            "timestamp": Self::timestamp(),
        }));
    }

    fn job_progress(&self, progress: &JobProgress) {
        // Without a known total, report every update; otherwise every 5%.
        if let Some(percent) = progress.percent() {
            let bucket = (percent as i64) / 5;
            let Ok(mut buckets) = self.last_progress_bucket.lock() else {
                return;
            };
            let last = buckets.entry(progress.input.clone()).or_insert(-1);
            if bucket <= *last && percent < 99.0 {
                return;
            }
            *last = bucket;
        }

        self.write_value(json!({
            "type": "job_progress",
            "input": progress.input,
            "frames_done": progress.frames_done,
            "frames_total": progress.frames_total,
            "percent": progress.percent(),
            "timestamp": Self::timestamp(),
        }));
    }

    fn job_complete(&self, job: &ConversionJob) {
        if let Ok(mut buckets) = self.last_progress_bucket.lock() {
            buckets.remove(&job.input);
        }
        self.write_value(json!({
            "type": "job_complete",
            "job": job,
            "timestamp": Self::timestamp(),
        }));
    }

    fn warning(&self, message: &str) {
        self.write_value(json!({
            "type": "warning",
            "message": message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn error(&self, error: &ReporterError) {
        self.write_value(json!({
            "type": "error",
            "title": error.title,
            "message": error.message,
            "context": error.context,
            "suggestion": error.suggestion,
            "timestamp": Self::timestamp(),
        }));
    }

    fn batch_complete(&self, result: &BatchResult) {
        self.write_value(json!({
            "type": "batch_complete",
            "succeeded": result.succeeded_count(),
            "failed": result.failed_count(),
            "total": result.jobs.len(),
            "total_output_size": result.total_output_size(),
            "duration_seconds": result.elapsed_secs,
            "timestamp": Self::timestamp(),
        }));
    }
}
